use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use gifbot_slack_runtime::{
    BotIdentity, ChatTransport, GifBotRouter, InboundMessage, Phrasing, RouteOutcome,
};
use gifbot_store::{GifStore, ManifestFile};
use tokio::sync::Mutex as AsyncMutex;

#[derive(Default)]
struct RecordingTransport {
    messages: AsyncMutex<Vec<(String, String)>>,
    reactions: AsyncMutex<Vec<(String, String, String)>>,
}

impl RecordingTransport {
    async fn take_messages(&self) -> Vec<String> {
        std::mem::take(&mut *self.messages.lock().await)
            .into_iter()
            .map(|(_, text)| text)
            .collect()
    }

    async fn reaction_names(&self) -> Vec<String> {
        self.reactions
            .lock()
            .await
            .iter()
            .map(|(_, _, name)| name.clone())
            .collect()
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn post_message(&self, channel: &str, text: &str) -> Result<()> {
        self.messages
            .lock()
            .await
            .push((channel.to_string(), text.to_string()));
        Ok(())
    }

    async fn add_reaction(&self, channel: &str, ts: &str, reaction: &str) -> Result<()> {
        self.reactions
            .lock()
            .await
            .push((channel.to_string(), ts.to_string(), reaction.to_string()));
        Ok(())
    }
}

fn router_for(manifest_path: &Path, seed: u64) -> GifBotRouter {
    let manifest = ManifestFile::new(manifest_path);
    let (store, _) = manifest
        .load(vec!["splendid".to_string()])
        .expect("load manifest");
    GifBotRouter::new(
        store,
        manifest,
        BotIdentity {
            bot_user_id: "UBOT".to_string(),
            bot_name: "gifbot".to_string(),
            owner_user_id: "UOWNER".to_string(),
        },
        Phrasing {
            nouns: vec!["buddy".to_string()],
            greetings: vec!["Here you go, {}!".to_string()],
            triggers: vec!["gif me".to_string()],
            reactions: vec!["tada".to_string()],
        },
        2,
    )
    .with_rng_seed(seed)
}

fn message(user_id: &str, channel_id: &str, text: &str, ts: &str) -> InboundMessage {
    InboundMessage {
        user_id: user_id.to_string(),
        channel_id: channel_id.to_string(),
        channel_type: None,
        text: text.to_string(),
        ts: ts.to_string(),
    }
}

fn record_set(store: &GifStore) -> Vec<(String, Vec<String>)> {
    store
        .records()
        .map(|(url, tags)| (url.to_string(), tags.iter().cloned().collect()))
        .collect()
}

#[tokio::test]
async fn integration_owner_curates_catalog_and_users_see_changes_after_restart() {
    let temp = tempfile::tempdir().expect("tempdir");
    let manifest_path = temp.path().join("manifest.csv");
    std::fs::write(&manifest_path, "https://x.test/cat.gif,cat\n").expect("seed manifest");
    let transport = RecordingTransport::default();

    let mut router = router_for(&manifest_path, 1);
    for (index, command) in [
        "add <https://x.test/dog.gif> dog good",
        "add https://x.test/both.gif cat dog",
        "remove https://x.test/cat.gif",
        "save",
    ]
    .iter()
    .enumerate()
    {
        let outcome = router
            .handle_message(
                &message("UOWNER", "D1", command, &format!("{index}.0")),
                &transport,
            )
            .await
            .expect("admin command");
        assert!(matches!(outcome, RouteOutcome::Admin(_)));
    }
    assert_eq!(
        transport.take_messages().await.last().map(String::as_str),
        Some("Manifest saved")
    );

    let mut restarted = router_for(&manifest_path, 2);
    assert_eq!(record_set(restarted.store()), record_set(router.store()));
    assert_eq!(restarted.store().tag_counts(), router.store().tag_counts());
    assert_eq!(restarted.store().count("dog"), 2);
    assert_eq!(restarted.store().count("cat"), 1);

    restarted
        .handle_message(
            &message("UALICE", "C1", "<@UBOT> request cat+dog", "10.0"),
            &transport,
        )
        .await
        .expect("mention request");
    restarted
        .handle_message(&message("UBOB", "C1", "please GIF ME now", "11.0"), &transport)
        .await
        .expect("trigger");

    let messages = transport.take_messages().await;
    assert_eq!(messages[0], "Here you go, buddy! https://x.test/both.gif");
    assert!(messages[1].starts_with("Here you go, buddy! https://x.test/"));
    assert_eq!(transport.reaction_names().await, vec!["tada", "tada"]);
}

#[tokio::test]
async fn integration_status_and_compare_reflect_store_contents() {
    let temp = tempfile::tempdir().expect("tempdir");
    let manifest_path = temp.path().join("manifest.csv");
    std::fs::write(
        &manifest_path,
        "u1,cat\nu2,cat,dog\nu3,owl\nu4,dog\nnot-a-record\n",
    )
    .expect("seed manifest");
    let transport = RecordingTransport::default();
    let mut router = router_for(&manifest_path, 3);

    router
        .handle_message(&message("UALICE", "C1", "@gifbot status", "1.0"), &transport)
        .await
        .expect("status");
    router
        .handle_message(
            &message("UALICE", "C1", "@gifbot compare cat dog owl", "2.0"),
            &transport,
        )
        .await
        .expect("compare");

    let messages = transport.take_messages().await;
    let status_lines = messages[0].lines().collect::<Vec<_>>();
    assert_eq!(status_lines[0], "We have 4 gifs, including...");
    assert_eq!(status_lines.len(), 4);
    assert_eq!(status_lines[3], "... and many more!");
    assert!(status_lines[1..3]
        .iter()
        .all(|line| line.contains(" splendid ")));
    assert_eq!(
        messages[1],
        "Current GIF counts:\n```  cat : 2\n  dog : 2\n  owl : 1\n```\nThe winner is.... both cat and dog!"
    );
}

#[tokio::test]
async fn integration_missing_gif_request_apologises_and_marks_message() {
    let temp = tempfile::tempdir().expect("tempdir");
    let manifest_path = temp.path().join("manifest.csv");
    std::fs::write(&manifest_path, "u1,cat\n").expect("seed manifest");
    let transport = RecordingTransport::default();
    let mut router = router_for(&manifest_path, 4);

    let outcome = router
        .handle_message(&message("UOWNER", "D1", "request unicorn", "1.0"), &transport)
        .await
        .expect("request");

    assert!(matches!(outcome, RouteOutcome::Admin(_)));
    assert_eq!(
        transport.take_messages().await,
        vec!["Sorry, I have no gifs of type `unicorn` :weary:"]
    );
    assert_eq!(transport.reaction_names().await, vec!["broken_heart"]);
}
