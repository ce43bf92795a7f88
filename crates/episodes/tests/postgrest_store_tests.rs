// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use chrono::Utc;
use episodes::{
    EpisodeStore, HintRecord, HintWrite, NewEpisode, NewFeedback, PostgrestEpisodeStore, RewardTag,
    StoreError,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "service-role-key";
const EPISODE: &str = "6b745e25-fa86-431b-9908-044d8a3ab09b";

async fn store(server: &MockServer) -> PostgrestEpisodeStore {
    PostgrestEpisodeStore::new(server.uri(), KEY).unwrap()
}

#[tokio::test]
async fn insert_episode_returns_row_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/episodes"))
        .and(header("apikey", KEY))
        .and(header("authorization", format!("Bearer {KEY}").as_str()))
        .and(header("prefer", "return=representation"))
        .and(body_partial_json(json!({
            "word_id": "en-0001",
            "target": "cat",
            "aliases": ["kitty"],
            "model_ckpt": "base"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{ "id": EPISODE }])))
        .expect(1)
        .mount(&server)
        .await;

    let id = store(&server)
        .await
        .insert_episode(NewEpisode {
            word_id: "en-0001".into(),
            target: "cat".into(),
            aliases: vec!["kitty".into()],
            model_ckpt: "base".into(),
        })
        .await
        .unwrap();
    assert_eq!(id, EPISODE);
}

#[tokio::test]
async fn fetch_episode_decodes_row_or_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/episodes"))
        .and(query_param("id", format!("eq.{EPISODE}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": EPISODE,
            "word_id": "en-0001",
            "target": "cat",
            "aliases": ["kitty"],
            "hint_text": "purrs a lot",
            "leaked": false,
            "tokens": 3,
            "hint_created_at": "2024-05-01T12:00:00.123456+00:00",
            "model_ckpt": "base",
            "created_at": "2024-05-01T11:59:00+00:00"
        }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/episodes"))
        .and(query_param("id", "eq.missing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let store = store(&server).await;
    let episode = store.fetch_episode(EPISODE).await.unwrap().unwrap();
    assert_eq!(episode.hint(), Some("purrs a lot"));
    assert_eq!(episode.tokens, Some(3));
    assert!(episode.hint_created_at.is_some());

    assert!(store.fetch_episode("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn record_hint_is_conditional_on_absent_hint() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/episodes"))
        .and(query_param("id", format!("eq.{EPISODE}").as_str()))
        .and(query_param("or", "(hint_text.is.null,hint_text.eq.)"))
        .and(body_partial_json(json!({ "hint_text": "purrs a lot", "tokens": 3, "leaked": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": EPISODE }])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/episodes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let store = store(&server).await;
    let record = HintRecord {
        hint_text: "purrs a lot".into(),
        leaked: false,
        tokens: 3,
        hint_created_at: Utc::now(),
    };
    assert_eq!(
        store.record_hint(EPISODE, record.clone()).await.unwrap(),
        HintWrite::Written
    );
    assert_eq!(
        store.record_hint(EPISODE, record).await.unwrap(),
        HintWrite::AlreadySet
    );
}

#[tokio::test]
async fn rejected_requests_surface_postgrest_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/episodes"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": "22P02",
            "message": "invalid input syntax for type uuid: \"nope\""
        })))
        .mount(&server)
        .await;

    let err = store(&server).await.fetch_episode("nope").await.unwrap_err();
    match err {
        StoreError::Rejected { status, message } => {
            assert_eq!(status, 400);
            assert!(message.contains("invalid input syntax"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn feedback_insert_and_listing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/feedback"))
        .and(body_partial_json(json!({
            "episode_id": EPISODE,
            "tag": "auto_len+solve",
            "guess": "cat"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{ "id": 17 }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/feedback"))
        .and(query_param("episode_id", format!("eq.{EPISODE}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 17, "episode_id": EPISODE, "reward": 0.9, "tag": "auto_len+solve", "guess": "cat" }
        ])))
        .mount(&server)
        .await;

    let store = store(&server).await;
    let id = store
        .insert_feedback(NewFeedback {
            episode_id: EPISODE.into(),
            reward: 0.9,
            tag: RewardTag::AutoLenSolve,
            guess: Some("cat".into()),
        })
        .await
        .unwrap();
    assert_eq!(id, "17");

    let rows = store.list_feedback(EPISODE).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, "17");
    assert_eq!(rows[0].tag, RewardTag::AutoLenSolve);
}
