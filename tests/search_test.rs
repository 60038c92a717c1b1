mod common;

use assert2::check;
use common::{collect, corpus, hit_keys, scored_keys, seeded};
use kvsearch::{BatchEntry, Index, KeyRange, PutOptions, Query, SearchOptions, TermEntry, TermOptions};
use rstest::rstest;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[tokio::test]
async fn ranks_by_frequency_weighted_score() {
    let index = seeded().await;
    let hits = collect(index.search_stream("green plant", SearchOptions::default())).await;

    check!(hit_keys(&hits) == vec!["b", "a", "c"]);
    check!(hits[0].value == corpus()[1]);
    // green: 3 documents; plant: 2 documents
    check!(close(hits[0].score, 1.0 / 3.0 + 2.0 / 2.0));
    check!(close(hits[1].score, 3.0 / 3.0));
    check!(close(hits[2].score, 1.0 / 3.0 + 1.0 / 2.0));
}

#[tokio::test]
async fn score_stream_matches_search_order() {
    let index = seeded().await;
    let scored = collect(index.score_stream("green plant", SearchOptions::default())).await;
    let hits = collect(index.search_stream("green plant", SearchOptions::default())).await;

    check!(scored_keys(&scored) == hit_keys(&hits));
    for (s, h) in scored.iter().zip(&hits) {
        check!(s.score == h.score);
    }
}

#[rstest]
#[case(SearchOptions::default().gt("b"), vec!["c"])]
#[case(SearchOptions::default().gte("b"), vec!["b", "c"])]
#[case(SearchOptions::default().lt("b"), vec!["a"])]
#[case(SearchOptions::default().lte("b"), vec!["b", "a"])]
#[case(SearchOptions::default().gt("a").lt("c"), vec!["b"])]
#[case(SearchOptions::default().gt("c").lt("a"), vec![])]
#[case(SearchOptions::default().range(KeyRange::prefix("c")), vec!["c"])]
#[tokio::test]
async fn restricts_to_id_range(#[case] options: SearchOptions, #[case] expected: Vec<&str>) {
    let index = seeded().await;
    let hits = collect(index.search_stream("green plant", options)).await;
    check!(hit_keys(&hits) == expected);
}

#[rstest]
#[case(0, None, vec!["b", "a", "c"])]
#[case(1, None, vec!["a", "c"])]
#[case(1, Some(1), vec!["a"])]
#[case(0, Some(2), vec!["b", "a"])]
#[case(3, None, vec![])]
#[tokio::test]
async fn pages_through_ranked_results(
    #[case] offset: usize,
    #[case] limit: Option<usize>,
    #[case] expected: Vec<&str>,
) {
    let index = seeded().await;
    let mut options = SearchOptions::default().offset(offset);
    options.limit = limit;
    let hits = collect(index.search_stream("green plant", options)).await;
    check!(hit_keys(&hits) == expected);
}

#[tokio::test]
async fn restricts_to_fields() {
    let index = seeded().await;
    let options = SearchOptions::default().fields(["title"]);
    let hits = collect(index.search_stream("green", options)).await;
    check!(hit_keys(&hits) == vec!["a"]);

    let options = SearchOptions::default().fields([("title", true), ("body", false)]);
    let hits = collect(index.search_stream("green", options)).await;
    check!(hit_keys(&hits) == vec!["a"]);
}

#[tokio::test]
async fn boosts_weighted_fields() {
    let index = seeded().await;
    let options = SearchOptions::default().fields([("title", 1.0), ("body", 10.0)]);
    let hits = collect(index.search_stream("watering plant", options.clone())).await;

    check!(hit_keys(&hits) == vec!["c", "b"]);
    // water: b title, c body; plant: b title and body, c body
    check!(close(hits[0].score, 10.0 / 2.0 + 10.0 / 2.0));
    check!(close(hits[1].score, 1.0 / 2.0 + 1.0 / 2.0 + 10.0 / 2.0));

    let hits = collect(index.search_stream("watering plant", options.lt("c"))).await;
    check!(hit_keys(&hits) == vec!["b"]);
}

#[tokio::test]
async fn pseudo_field_groups_add_up() {
    let index = seeded().await;
    let query = Query::from([
        ("title", "Professor Plumb loves plant"),
        ("message", "He has a green plant in his study"),
    ]);
    let hits = collect(index.search_stream(query, SearchOptions::default())).await;
    check!(hit_keys(&hits) == vec!["b", "c", "a"]);

    // plant appears in both groups and counts twice
    let plain = collect(index.score_stream("plant", SearchOptions::default())).await;
    let grouped = collect(
        index.score_stream(Query::from([("x", "plant"), ("y", "plant")]), SearchOptions::default()),
    )
    .await;
    check!(scored_keys(&grouped) == scored_keys(&plain));
    check!(close(grouped[0].score, plain[0].score * 2.0));
}

#[tokio::test]
async fn tokens_match_verbatim() {
    let index = seeded().await;
    let from_text = collect(index.score_stream("green plant", SearchOptions::default())).await;
    let from_tokens =
        collect(index.score_stream(vec!["green", "plant", ""], SearchOptions::default())).await;
    check!(from_tokens == from_text);

    // Not stemmed, so "watering" is not in the dictionary.
    let unstemmed = collect(index.score_stream(vec!["watering"], SearchOptions::default())).await;
    check!(unstemmed.is_empty());
}

#[rstest]
#[case("")]
#[case("the and of")]
#[case("xylophone")]
#[tokio::test]
async fn queries_without_known_terms_match_nothing(#[case] text: &str) {
    let index = seeded().await;
    let hits = collect(index.search_stream(text, SearchOptions::default())).await;
    check!(hits.is_empty());
}

#[tokio::test]
async fn expands_query_prefixes() {
    let index = seeded().await;
    let exact = collect(index.search_stream("pla", SearchOptions::default())).await;
    check!(exact.is_empty());

    let expanded =
        collect(index.search_stream("pla", SearchOptions::default().expansions(1))).await;
    check!(hit_keys(&expanded) == vec!["b", "c"]);
}

#[tokio::test]
async fn lists_terms_with_frequencies() {
    let index = seeded().await;
    let terms = collect(index.term_stream(TermOptions::default().prefix("plumb").limit(1))).await;
    check!(
        terms
            == vec![TermEntry {
                term: "plumb".into(),
                frequency: 2
            }]
    );
    check!(terms[0].key() == "@plumb");

    let all = collect(index.term_stream(TermOptions::default())).await;
    let mut sorted = all.clone();
    sorted.sort_by(|a, b| a.term.cmp(&b.term));
    check!(all == sorted, "terms come back in lexical order");
    check!(all.iter().all(|t| t.frequency > 0));
}

#[tokio::test]
async fn index_time_fields_limit_what_is_searchable() {
    let index = Index::memory();
    let entries: Vec<BatchEntry> = corpus()
        .into_iter()
        .map(|doc| {
            let id = doc["id"].as_str().unwrap_or_default().to_string();
            BatchEntry::put(id, doc).with_fields(["body"])
        })
        .collect();
    index.batch(entries).await.unwrap();

    let hits = collect(index.search_stream("watering plant", SearchOptions::default())).await;
    check!(hit_keys(&hits) == vec!["c", "b"]);
    // water only occurs in the body of c
    check!(close(hits[0].score, 1.0 + 1.0 / 2.0));

    let titles = collect(index.search_stream("kills", SearchOptions::default())).await;
    check!(hit_keys(&titles) == vec!["a"], "killed in the body still matches");
    let ids = collect(index.search_stream("foo", SearchOptions::default())).await;
    check!(ids.is_empty(), "the title of d was not indexed");
}

#[tokio::test]
async fn put_options_restrict_fields() {
    let index = Index::memory();
    let doc = serde_json::json!({"title": "hidden", "body": "visible"});
    index
        .put_with("x", doc.clone(), PutOptions::default().fields(["body"]))
        .await
        .unwrap();

    check!(index.get("x").unwrap() == doc, "the whole document is stored");
    let hidden = collect(index.search_stream("hidden", SearchOptions::default())).await;
    check!(hidden.is_empty());
    let visible = collect(index.search_stream("visible", SearchOptions::default())).await;
    check!(hit_keys(&visible) == vec!["x"]);
}

#[tokio::test]
async fn deletes_remove_postings_and_terms() {
    let index = seeded().await;
    index.delete("b").await.unwrap();

    let hits = collect(index.search_stream("green plant", SearchOptions::default())).await;
    check!(hit_keys(&hits) == vec!["a", "c"]);

    let plumb = collect(index.term_stream(TermOptions::default().prefix("plumb"))).await;
    check!(plumb[0].frequency == 1);

    index.delete("c").await.unwrap();
    let gone = collect(index.term_stream(TermOptions::default().prefix("plumb"))).await;
    check!(gone.is_empty(), "terms with no documents leave the dictionary");
}

#[tokio::test]
async fn words_sharing_a_stop_word_root_stay_searchable() {
    let index = Index::memory();
    index.put("x", "John Doe said hi").await.unwrap();
    index.put("y", "she does very little").await.unwrap();

    let hits = collect(index.search_stream("doe", SearchOptions::default())).await;
    check!(hit_keys(&hits) == vec!["x"]);
    check!(collect(index.search_stream("very", SearchOptions::default())).await.is_empty());
    let tokens = index.pipeline("John Doe said hi using types").await.unwrap();
    check!(tokens == vec!["john", "doe", "said", "hi"]);
}
