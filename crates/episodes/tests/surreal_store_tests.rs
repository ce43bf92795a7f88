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
use episodes::{EpisodeStore, HintRecord, HintWrite, NewEpisode, NewFeedback, RewardTag, SurrealEpisodeStore};

fn cat_episode() -> NewEpisode {
    NewEpisode {
        word_id: "en-0001".into(),
        target: "cat".into(),
        aliases: vec!["kitty".into(), "feline".into()],
        model_ckpt: "base".into(),
    }
}

fn hint(text: &str) -> HintRecord {
    HintRecord {
        hint_text: text.into(),
        leaked: false,
        tokens: 4,
        hint_created_at: Utc::now(),
    }
}

#[tokio::test]
async fn inserted_episode_round_trips_without_hint() {
    let store = SurrealEpisodeStore::in_memory().await.expect("mem store");
    let id = store.insert_episode(cat_episode()).await.unwrap();

    let episode = store.fetch_episode(&id).await.unwrap().expect("episode");
    assert_eq!(episode.id, id);
    assert_eq!(episode.word_id, "en-0001");
    assert_eq!(episode.target, "cat");
    assert_eq!(episode.aliases, vec!["kitty", "feline"]);
    assert_eq!(episode.model_ckpt, "base");
    assert!(episode.hint_text.is_none());
    assert!(episode.leaked.is_none());
    assert!(episode.tokens.is_none());
    assert!(episode.hint_created_at.is_none());
}

#[tokio::test]
async fn unknown_episode_fetches_as_none() {
    let store = SurrealEpisodeStore::in_memory().await.expect("mem store");
    assert!(store.fetch_episode("no-such-episode").await.unwrap().is_none());
}

#[tokio::test]
async fn hint_is_written_exactly_once() {
    let store = SurrealEpisodeStore::in_memory().await.expect("mem store");
    let id = store.insert_episode(cat_episode()).await.unwrap();

    let first = store.record_hint(&id, hint("purrs on your lap")).await.unwrap();
    assert_eq!(first, HintWrite::Written);

    let second = store.record_hint(&id, hint("barks at the mailman")).await.unwrap();
    assert_eq!(second, HintWrite::AlreadySet);

    let episode = store.fetch_episode(&id).await.unwrap().unwrap();
    assert_eq!(episode.hint_text.as_deref(), Some("purrs on your lap"));
    assert_eq!(episode.leaked, Some(false));
    assert_eq!(episode.tokens, Some(4));
    assert!(episode.hint_created_at.is_some());
}

#[tokio::test]
async fn feedback_rows_accumulate_per_episode() {
    let store = SurrealEpisodeStore::in_memory().await.expect("mem store");
    let id = store.insert_episode(cat_episode()).await.unwrap();
    let other = store.insert_episode(cat_episode()).await.unwrap();

    let a = store
        .insert_feedback(NewFeedback {
            episode_id: id.clone(),
            reward: 0.5,
            tag: RewardTag::AutoLen,
            guess: Some("dog".into()),
        })
        .await
        .unwrap();
    let b = store
        .insert_feedback(NewFeedback {
            episode_id: id.clone(),
            reward: -1.0,
            tag: RewardTag::Leak,
            guess: None,
        })
        .await
        .unwrap();
    assert_ne!(a, b);

    let mut rows = store.list_feedback(&id).await.unwrap();
    rows.sort_by(|x, y| x.reward.total_cmp(&y.reward));
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].tag, RewardTag::Leak);
    assert!(rows[0].guess.is_none());
    assert_eq!(rows[1].guess.as_deref(), Some("dog"));
    assert!(rows.iter().all(|row| row.episode_id == id));

    assert!(store.list_feedback(&other).await.unwrap().is_empty());
}
