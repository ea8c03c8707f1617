//! User-facing message texts.

use chrono::Local;
use pwnyaa_sites::{Profile, SolvedInfo};
use pwnyaa_storage::Contest;

use crate::digest::{DailyEntry, RankEntry};

pub const UNKNOWN_COMMAND: &str = ":wakarazu:";

pub const JOIN_USAGE: &str = "*join* コマンド: ある常設CTFに登録する\n  _join_  _<CTF name/alias>_  _<User ID>_";

pub const CHECK_USAGE: &str = "*check* コマンド: あるCTFにおける自分のステータス確認\n  _check_  _<CTF name/alias>_";

pub const COMMAND_FAILED: &str = "ごめん、処理に失敗しちゃった... もう一度試してみてね :cry:";

pub const NOBODY_SOLVED: &str = "今週は誰も問題を解かなかったよ... :cry:";

/// One block per contest: title, url, challenge count and members.
pub fn contest_summary(contests: &[Contest]) -> String {
    let mut text = String::new();
    for contest in contests {
        text.push_str(&format!("*{}* ({})\n", contest.title, contest.url));
        text.push_str(&format!("  問題数: {}\n", contest.num_challs));
        if contest.joining_users.is_empty() {
            text.push_str("  参加者: なし\n");
        } else {
            text.push_str(&format!("  参加者: {}匹\n", contest.joining_users.len()));
            for user in &contest.joining_users {
                text.push_str(&format!("   {}", user.slack_id));
            }
            text.push('\n');
        }
    }
    if text.is_empty() {
        text.push_str("登録されてるコンテストはまだないよ");
    }
    text
}

pub fn contest_not_found(name: &str) -> String {
    format!("コンテスト *{name}* は見つからなかったよ...\n現在登録されてるコンテスト一覧を見てね!")
}

pub fn user_not_found(id_ctf: &str, contest_title: &str) -> String {
    format!("ユーザ *{id_ctf}* は *{contest_title}* に見つからなかったよ:cry:")
}

pub fn joined(profile: &Profile) -> String {
    format!(
        "登録したよ! :azaika:\n  ユーザ名  : {}\n  スコア   : {}\n  ランキング: {}\n  {}",
        profile.username, profile.score, profile.rank, profile.comment
    )
}

pub fn not_joined(name: &str) -> String {
    format!("まだ *{name}* に参加してないよ。 *join* コマンドで参加登録してね!")
}

pub fn check_notice(profile: &Profile) -> String {
    format!("*{}* の情報だよ！スレッドを見てね。", profile.username)
}

/// Profile with every solved challenge, posted in the thread.
pub fn check_detail(profile: &Profile) -> String {
    format!(
        "ユーザ名  : {}\nスコア   : {}\nランキング: {}\n{}\n\n解いた問題:\n{}",
        profile.username,
        profile.score,
        profile.rank,
        profile.comment,
        solved_lines(&profile.solved, 2)
    )
}

fn solved_lines(solved: &[SolvedInfo], indent: usize) -> String {
    solved
        .iter()
        .map(|s| {
            format!(
                "{}{}({}) {}\n",
                " ".repeat(indent),
                s.name,
                s.score,
                s.solved_at.with_timezone(&Local).format("%Y/%m/%d %H:%M:%S")
            )
        })
        .collect()
}

/// Daily digest, `None` when nobody solved anything.
pub fn daily_digest(entries: &[DailyEntry]) -> Option<String> {
    if entries.is_empty() {
        return None;
    }
    let mut text = String::from("昨日問題を解いた人たちだよ! :pwn:\n");
    for entry in entries {
        text.push_str(&format!(
            "<@{}> ({}) : {}問\n",
            entry.slack_id,
            entry.contest_title,
            entry.solved.len()
        ));
        text.push_str(&solved_lines(&entry.solved, 4));
    }
    Some(text)
}

/// Weekly ranking, or the "nobody solved" message for an empty week.
pub fn weekly_digest(ranking: &[RankEntry]) -> String {
    if ranking.iter().all(|entry| entry.solved == 0) {
        return NOBODY_SOLVED.to_string();
    }
    let mut text = String::from("今週のランキングだよ! :pwn:\n");
    for (place, entry) in ranking.iter().enumerate() {
        text.push_str(&format!(
            "  {}位 <@{}> ({}) : {}問\n",
            place + 1,
            entry.slack_id,
            entry.contest_title,
            entry.solved
        ));
    }
    text
}

pub fn achievement_unlocked(slack_id: &str, achievement: &str) -> String {
    format!("<@{slack_id}> が実績 *{achievement}* を解除したよ! :tada:")
}
