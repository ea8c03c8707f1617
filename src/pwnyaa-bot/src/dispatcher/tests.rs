//! Tests for command parsing and dispatch.

use std::sync::Arc;

use chrono::Utc;
use pretty_assertions::assert_eq;
use pwnyaa_slack::{EventContext, SlackEventHandler};
use pwnyaa_storage::{AliasMatch, ContestSeed, StateStore, User};
use tempfile::{TempDir, tempdir};

use super::{Command, Dispatcher};
use crate::config::PostingIdentity;
use crate::format;
use crate::registry::SiteRegistry;
use crate::testing::{FakeChat, FakeSite, profile, solves};

struct Harness {
    dir: TempDir,
    store: Arc<StateStore>,
    chat: Arc<FakeChat>,
    dispatcher: Dispatcher,
}

async fn harness(alias_match: AliasMatch) -> Harness {
    let dir = tempdir().unwrap();
    let store = Arc::new(StateStore::open(dir.path().join("state.json")).await.unwrap());
    store
        .upsert_contest(&ContestSeed::new(0, "pwnable.tw", "https://pwnable.tw", "tw", 48))
        .await
        .unwrap();
    store
        .upsert_contest(&ContestSeed::new(1, "pwnable.xyz", "https://pwnable.xyz", "xyz", 30))
        .await
        .unwrap();

    let now = Utc::now();
    let tw = FakeSite::tw()
        .with_profile("alice", profile("alice", solves(2, now, 5)))
        .with_profile("alice2", profile("alice2", Vec::new()));
    let xyz = FakeSite::xyz().with_profile("bob", profile("bob", Vec::new()));
    let sites = SiteRegistry::new(vec![Arc::new(tw), Arc::new(xyz)]);

    let chat = Arc::new(FakeChat::default());
    let dispatcher = Dispatcher::new(
        store.clone(),
        sites,
        chat.clone(),
        alias_match,
        PostingIdentity::default(),
    );

    Harness {
        dir,
        store,
        chat,
        dispatcher,
    }
}

fn ctx(user: &str) -> EventContext {
    EventContext {
        user_id: user.to_string(),
        channel_id: "C1".to_string(),
        message_ts: "1700000000.000100".to_string(),
        thread_ts: None,
    }
}

async fn run(h: &Harness, user: &str, text: &str) {
    h.dispatcher
        .dispatch(Command::parse(text), &ctx(user))
        .await
        .unwrap();
}

#[test]
fn test_parse_commands() {
    assert_eq!(Command::parse("list"), Command::List);
    assert_eq!(
        Command::parse("join  tw   alice"),
        Command::Join {
            contest: Some("tw".into()),
            id_ctf: Some("alice".into())
        }
    );
    assert_eq!(
        Command::parse("join tw"),
        Command::Join {
            contest: Some("tw".into()),
            id_ctf: None
        }
    );
    assert_eq!(Command::parse("check"), Command::Check { contest: None });
    assert_eq!(Command::parse("dance"), Command::Unknown("dance".into()));
    assert_eq!(Command::parse(""), Command::Unknown(String::new()));
}

#[tokio::test]
async fn test_list_summarizes_contests() {
    let h = harness(AliasMatch::Exact).await;

    run(&h, "U1", "list").await;

    let texts = h.chat.texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("*pwnable.tw* (https://pwnable.tw)"));
    assert!(texts[0].contains("問題数: 30"));
}

#[tokio::test]
async fn test_replies_carry_posting_identity() {
    let h = harness(AliasMatch::Exact).await;

    run(&h, "U1", "list").await;

    let post = &h.chat.posts()[0];
    assert_eq!(post.channel, "C1");
    assert_eq!(post.content.username.as_deref(), Some("pwnyaa"));
    assert_eq!(post.content.icon_emoji.as_deref(), Some(":pwn:"));
    assert_eq!(post.content.thread_ts, None);
}

#[tokio::test]
async fn test_join_without_arguments_shows_usage() {
    let h = harness(AliasMatch::Exact).await;

    run(&h, "U1", "join tw").await;

    assert_eq!(h.chat.texts(), vec![format::JOIN_USAGE.to_string()]);
    assert!(h.store.snapshot().await.users.is_empty());
}

#[tokio::test]
async fn test_join_unknown_contest_reemits_list() {
    let h = harness(AliasMatch::Exact).await;

    run(&h, "U1", "join hxp alice").await;

    let texts = h.chat.texts();
    assert_eq!(texts.len(), 2);
    assert_eq!(texts[0], format::contest_not_found("hxp"));
    assert!(texts[1].contains("*pwnable.xyz*"));
    assert!(h.chat.reactions.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_join_links_verified_user() {
    let h = harness(AliasMatch::Exact).await;

    run(&h, "U1", "join tw alice").await;

    let reactions = h.chat.reactions.lock().unwrap().clone();
    assert_eq!(
        reactions,
        vec![("C1".into(), "1700000000.000100".into(), "ok".into())]
    );

    let texts = h.chat.texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].starts_with("登録したよ! :azaika:"));
    assert!(texts[0].contains("ユーザ名  : alice"));

    let state = h.store.snapshot().await;
    assert_eq!(state.users, vec![User::new("U1", "")]);
    assert_eq!(state.contests[0].joining_users, vec![User::new("U1", "alice")]);
}

#[tokio::test]
async fn test_join_by_title_and_other_site() {
    let h = harness(AliasMatch::Exact).await;

    run(&h, "U2", "join pwnable.xyz bob").await;

    let state = h.store.snapshot().await;
    assert_eq!(state.contests[1].joining_users, vec![User::new("U2", "bob")]);
    assert!(state.contests[0].joining_users.is_empty());
}

#[tokio::test]
async fn test_repeated_join_converges_to_latest_id() {
    let h = harness(AliasMatch::Exact).await;

    run(&h, "U1", "join tw alice").await;
    run(&h, "U1", "join tw alice2").await;

    let state = h.store.snapshot().await;
    assert_eq!(state.users.len(), 1);
    assert_eq!(state.contests[0].joining_users, vec![User::new("U1", "alice2")]);
}

#[tokio::test]
async fn test_join_unknown_user_does_not_link() {
    let h = harness(AliasMatch::Exact).await;

    run(&h, "U1", "join tw ghost").await;

    assert_eq!(
        h.chat.texts(),
        vec![format::user_not_found("ghost", "pwnable.tw")]
    );
    let state = h.store.snapshot().await;
    assert!(state.contests[0].joining_users.is_empty());
    // The acknowledgement and registry entry precede verification.
    assert_eq!(h.chat.reactions.lock().unwrap().len(), 1);
    assert_eq!(state.users.len(), 1);
}

#[tokio::test]
async fn test_alias_match_strictness() {
    let strict = harness(AliasMatch::Exact).await;
    run(&strict, "U1", "join TW alice").await;
    assert_eq!(strict.chat.texts()[0], format::contest_not_found("TW"));

    let lenient = harness(AliasMatch::CaseInsensitive).await;
    run(&lenient, "U1", "join TW alice").await;
    assert_eq!(
        lenient.store.snapshot().await.contests[0].joining_users,
        vec![User::new("U1", "alice")]
    );
}

#[tokio::test]
async fn test_check_before_join_is_not_joined() {
    let h = harness(AliasMatch::Exact).await;

    run(&h, "U1", "check tw").await;

    assert_eq!(h.chat.texts(), vec![format::not_joined("tw")]);
}

#[tokio::test]
async fn test_check_without_argument_shows_usage() {
    let h = harness(AliasMatch::Exact).await;

    run(&h, "U1", "check").await;

    assert_eq!(h.chat.texts(), vec![format::CHECK_USAGE.to_string()]);
}

#[tokio::test]
async fn test_check_posts_notice_and_threaded_detail() {
    let h = harness(AliasMatch::Exact).await;
    run(&h, "U1", "join tw alice").await;

    run(&h, "U1", "check tw").await;

    let posts = h.chat.posts();
    assert_eq!(posts.len(), 3);
    assert_eq!(posts[1].content.text, "*alice* の情報だよ！スレッドを見てね。");
    assert_eq!(posts[1].content.thread_ts, None);
    assert!(posts[2].content.text.contains("解いた問題:\n"));
    assert_eq!(posts[2].content.text.matches("(100)").count(), 2);
    assert_eq!(
        posts[2].content.thread_ts.as_deref(),
        Some("1700000000.000100")
    );
}

#[tokio::test]
async fn test_check_matches_aliases_only() {
    let h = harness(AliasMatch::Exact).await;
    run(&h, "U1", "join tw alice").await;

    run(&h, "U1", "check pwnable.tw").await;

    assert_eq!(
        h.chat.texts().last().cloned(),
        Some(format::not_joined("pwnable.tw"))
    );
}

#[tokio::test]
async fn test_check_is_per_user() {
    let h = harness(AliasMatch::Exact).await;
    run(&h, "U1", "join tw alice").await;

    run(&h, "U2", "check tw").await;

    assert_eq!(h.chat.texts().last().cloned(), Some(format::not_joined("tw")));
}

#[tokio::test]
async fn test_unknown_command() {
    let h = harness(AliasMatch::Exact).await;

    run(&h, "U1", "dance").await;

    assert_eq!(h.chat.texts(), vec![":wakarazu:".to_string()]);
}

#[tokio::test]
async fn test_handler_entry_point_parses_text() {
    let h = harness(AliasMatch::Exact).await;

    h.dispatcher
        .handle_command("check".to_string(), ctx("U1"))
        .await
        .unwrap();

    assert_eq!(h.chat.texts(), vec![format::CHECK_USAGE.to_string()]);
}

#[tokio::test]
async fn test_storage_failure_is_reported_in_chat() {
    let h = harness(AliasMatch::Exact).await;
    std::fs::create_dir(h.dir.path().join("state.json.tmp")).unwrap();

    run(&h, "U9", "join tw alice").await;

    assert_eq!(h.chat.texts(), vec![format::COMMAND_FAILED.to_string()]);
    assert!(
        h.store
            .find_membership("U9", "tw", AliasMatch::Exact)
            .await
            .is_none()
    );
    assert!(h.store.snapshot().await.users.is_empty());
}
