//! Email content rendering.
//!
//! Every function here is pure: the same inputs always produce the same
//! subject and HTML body. All task and user data is resolved by the caller
//! before rendering, so these functions never touch the network.

mod templates;

use serde::{Deserialize, Serialize};

/// Subject length cap for mention alerts.
const MENTION_SUBJECT_MAX: usize = 78;

/// Title budget inside a capped mention subject: 78 minus the
/// "💬 " prefix (2 chars), the " - you were mentioned" suffix (21 chars),
/// and the "..." ellipsis (3 chars).
const MENTION_TITLE_BUDGET: usize = 52;

/// A rendered email, ready for the delivery gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailContent {
    pub subject: String,
    pub html: String,
}

/// Optional presentation metadata carried on mention events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentMeta {
    /// Display timestamp for the comment. Rendered as "just now" when absent.
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Avatar initials. Derived from the author name when absent.
    #[serde(default)]
    pub author_initials: Option<String>,
}

/// Visual theme attached to a reminder or alert urgency level.
struct UrgencyTheme {
    color: &'static str,
    icon: &'static str,
    label: &'static str,
}

fn status_color(status: &str) -> &'static str {
    match status {
        "Unassigned" => "#94A3B8",
        "Ongoing" => "#3B82F6",
        "Under Review" => "#F59E0B",
        "Completed" => "#10B981",
        _ => "#6B7280",
    }
}

fn status_icon(status: &str) -> &'static str {
    match status {
        "Unassigned" => "\u{1F4CB}",   // 📋
        "Ongoing" => "\u{1F504}",      // 🔄
        "Under Review" => "\u{1F440}", // 👀
        "Completed" => "\u{2705}",     // ✅
        _ => "\u{1F4CC}",              // 📌
    }
}

fn reminder_theme(days_before: u32) -> UrgencyTheme {
    match days_before {
        7 => UrgencyTheme {
            color: "#3B82F6",
            icon: "\u{1F4CC}", // 📌
            label: "UPCOMING",
        },
        3 => UrgencyTheme {
            color: "#F59E0B",
            icon: "\u{26A0}\u{FE0F}", // ⚠️
            label: "IMPORTANT",
        },
        1 => UrgencyTheme {
            color: "#EF4444",
            icon: "\u{1F6A8}", // 🚨
            label: "URGENT",
        },
        _ => UrgencyTheme {
            color: "#6B7280",
            icon: "\u{1F4CC}", // 📌
            label: "REMINDER",
        },
    }
}

fn overdue_theme(days_overdue: i64) -> (UrgencyTheme, &'static str) {
    match days_overdue {
        1 => (
            UrgencyTheme {
                color: "#F59E0B",
                icon: "\u{23F0}", // ⏰
                label: "JUST OVERDUE",
            },
            "This task was due yesterday. A quick follow-up now keeps it from slipping further.",
        ),
        2..=3 => (
            UrgencyTheme {
                color: "#F97316",
                icon: "\u{26A0}\u{FE0F}", // ⚠️
                label: "NEEDS ATTENTION",
            },
            "This task is several days past its deadline and needs attention.",
        ),
        _ => (
            UrgencyTheme {
                color: "#EF4444",
                icon: "\u{1F6A8}", // 🚨
                label: "CRITICALLY OVERDUE",
            },
            "This task is critically overdue. Please review it or update its deadline.",
        ),
    }
}

/// Truncates by character count: text longer than `max` is cut to `keep`
/// characters plus an ellipsis.
fn truncate(text: &str, max: usize, keep: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(keep).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

fn kind_label(is_subtask: bool) -> &'static str {
    if is_subtask {
        "Subtask"
    } else {
        "Task"
    }
}

fn plural_days(n: u32) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// Renders a status-change email.
#[allow(clippy::too_many_arguments)]
pub fn status_update(
    title: &str,
    old_status: &str,
    new_status: &str,
    changed_by_name: &str,
    deadline: &str,
    description: &str,
    is_subtask: bool,
) -> EmailContent {
    let kind = kind_label(is_subtask);
    // Unlike reminders, status subjects carry no icon; the icon only
    // appears in the body header.
    let subject = format!("{} Status Updated: {}", kind, title);

    let html = templates::status_update_html(
        kind,
        title,
        old_status,
        status_color(old_status),
        new_status,
        status_color(new_status),
        status_icon(new_status),
        changed_by_name,
        deadline,
        &truncate(description, 200, 197),
    );

    EmailContent { subject, html }
}

/// Renders a deadline reminder email for an upcoming threshold.
pub fn deadline_reminder(
    title: &str,
    days_before: u32,
    deadline: &str,
    description: &str,
    task_status: &str,
    is_subtask: bool,
) -> EmailContent {
    let theme = reminder_theme(days_before);
    let subject = format!(
        "{} Reminder: {} - Due in {} day{}!",
        theme.icon,
        title,
        days_before,
        plural_days(days_before)
    );

    let html = templates::deadline_reminder_html(
        kind_label(is_subtask),
        title,
        days_before,
        plural_days(days_before),
        deadline,
        &truncate(description, 180, 180),
        task_status,
        status_color(task_status),
        theme.color,
        theme.icon,
        theme.label,
    );

    EmailContent { subject, html }
}

/// Renders an overdue alert email.
pub fn overdue_alert(
    title: &str,
    days_overdue: i64,
    deadline: &str,
    description: &str,
    task_status: &str,
    is_subtask: bool,
) -> EmailContent {
    let (theme, message) = overdue_theme(days_overdue);
    let day_word = if days_overdue == 1 { "day" } else { "days" };
    let subject = format!(
        "{} Overdue: {} - {} {} past deadline",
        theme.icon, title, days_overdue, day_word
    );

    let html = templates::overdue_alert_html(
        kind_label(is_subtask),
        title,
        days_overdue,
        day_word,
        deadline,
        &truncate(description, 200, 197),
        task_status,
        status_color(task_status),
        theme.color,
        theme.icon,
        theme.label,
        message,
    );

    EmailContent { subject, html }
}

/// Renders an @-mention alert email.
///
/// The subject is capped at 78 characters; a long task title is truncated
/// so the prefix and suffix always survive intact.
pub fn mention_alert(
    title: &str,
    author_name: &str,
    comment_body: &str,
    meta: &CommentMeta,
) -> EmailContent {
    let prefix = "\u{1F4AC} "; // 💬
    let suffix = " - you were mentioned";

    let full_len = 2 + title.chars().count() + suffix.chars().count();
    let subject = if full_len > MENTION_SUBJECT_MAX {
        let head: String = title.chars().take(MENTION_TITLE_BUDGET).collect();
        format!("{}{}...{}", prefix, head, suffix)
    } else {
        format!("{}{}{}", prefix, title, suffix)
    };

    let timestamp = meta.timestamp.as_deref().unwrap_or("just now");
    let initials = match meta.author_initials.as_deref() {
        Some(i) if !i.is_empty() => i.to_string(),
        _ => author_name
            .chars()
            .next()
            .map(|c| c.to_uppercase().to_string())
            .unwrap_or_else(|| "?".to_string()),
    };

    let html =
        templates::mention_alert_html(title, author_name, &initials, timestamp, comment_body);

    EmailContent { subject, html }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_colors_and_icons() {
        assert_eq!(status_color("Unassigned"), "#94A3B8");
        assert_eq!(status_color("Ongoing"), "#3B82F6");
        assert_eq!(status_color("Under Review"), "#F59E0B");
        assert_eq!(status_color("Completed"), "#10B981");
        assert_eq!(status_color("Archived"), "#6B7280");

        assert_eq!(status_icon("Completed"), "\u{2705}");
        assert_eq!(status_icon("Archived"), "\u{1F4CC}");
    }

    #[test]
    fn test_status_update_subject() {
        let email = status_update(
            "Ship the release",
            "Ongoing",
            "Completed",
            "Dana",
            "September 01, 2026 at 02:00 PM",
            "Final pass",
            false,
        );
        assert_eq!(email.subject, "Task Status Updated: Ship the release");
        assert!(email.html.contains("Ongoing"));
        assert!(email.html.contains("Completed"));
        assert!(email.html.contains("Dana"));
    }

    #[test]
    fn test_status_update_subtask_label() {
        let email = status_update("S", "Ongoing", "Under Review", "Dana", "No deadline set", "", true);
        assert_eq!(email.subject, "Subtask Status Updated: S");
    }

    #[test]
    fn test_status_description_truncation() {
        let long = "x".repeat(250);
        let email = status_update("T", "Ongoing", "Completed", "Dana", "d", &long, false);

        let expected = format!("{}...", "x".repeat(197));
        assert!(email.html.contains(&expected));
        assert!(!email.html.contains(&"x".repeat(198)));
    }

    #[test]
    fn test_status_description_exactly_200_untruncated() {
        let exact = "y".repeat(200);
        let email = status_update("T", "Ongoing", "Completed", "Dana", "d", &exact, false);
        assert!(email.html.contains(&exact));
        assert!(!email.html.contains(&format!("{}...", "y".repeat(197))));
    }

    #[test]
    fn test_reminder_subjects_and_themes() {
        let seven = deadline_reminder("T", 7, "d", "", "Ongoing", false);
        assert_eq!(seven.subject, "\u{1F4CC} Reminder: T - Due in 7 days!");
        assert!(seven.html.contains("#3B82F6"));
        assert!(seven.html.contains("UPCOMING"));

        let three = deadline_reminder("T", 3, "d", "", "Ongoing", false);
        assert_eq!(three.subject, "\u{26A0}\u{FE0F} Reminder: T - Due in 3 days!");
        assert!(three.html.contains("IMPORTANT"));

        let one = deadline_reminder("T", 1, "d", "", "Ongoing", false);
        assert_eq!(one.subject, "\u{1F6A8} Reminder: T - Due in 1 day!");
        assert!(one.html.contains("#EF4444"));
        assert!(one.html.contains("URGENT"));
    }

    #[test]
    fn test_unknown_reminder_threshold_gets_neutral_theme() {
        let odd = deadline_reminder("T", 5, "d", "", "Ongoing", false);
        assert!(odd.html.contains("#6B7280"));
        assert!(odd.html.contains("REMINDER"));
        assert!(!odd.html.contains("URGENT"));
    }

    #[test]
    fn test_reminder_description_truncation() {
        let long = "z".repeat(181);
        let email = deadline_reminder("T", 7, "d", &long, "Ongoing", false);

        let expected = format!("{}...", "z".repeat(180));
        assert!(email.html.contains(&expected));

        let exact = "z".repeat(180);
        let untouched = deadline_reminder("T", 7, "d", &exact, "Ongoing", false);
        assert!(!untouched.html.contains("..."));
    }

    #[test]
    fn test_overdue_tiers() {
        let one = overdue_alert("T", 1, "d", "", "Ongoing", false);
        assert!(one.subject.contains("1 day past deadline"));
        assert!(one.html.contains("JUST OVERDUE"));
        assert!(one.html.contains("due yesterday"));

        let two = overdue_alert("T", 2, "d", "", "Ongoing", false);
        assert!(two.html.contains("NEEDS ATTENTION"));
        let three = overdue_alert("T", 3, "d", "", "Ongoing", false);
        assert!(three.html.contains("NEEDS ATTENTION"));

        let ten = overdue_alert("T", 10, "d", "", "Ongoing", false);
        assert!(ten.subject.contains("10 days past deadline"));
        assert!(ten.html.contains("CRITICALLY OVERDUE"));
        assert!(ten.html.contains("#EF4444"));
    }

    #[test]
    fn test_mention_subject_short_title() {
        let email = mention_alert("Fix login", "Priya", "@sam take a look", &CommentMeta::default());
        assert_eq!(email.subject, "\u{1F4AC} Fix login - you were mentioned");
        assert!(email.subject.chars().count() <= 78);
    }

    #[test]
    fn test_mention_subject_long_title_capped() {
        let title = "a".repeat(120);
        let email = mention_alert(&title, "Priya", "body", &CommentMeta::default());

        assert_eq!(email.subject.chars().count(), 78);
        assert!(email.subject.starts_with("\u{1F4AC} "));
        assert!(email.subject.ends_with(" - you were mentioned"));
        assert!(email.subject.contains(&format!("{}...", "a".repeat(52))));
    }

    #[test]
    fn test_mention_subject_boundary() {
        // 2 (prefix) + 55 (title) + 21 (suffix) = 78, exactly at the cap
        let title = "b".repeat(55);
        let email = mention_alert(&title, "Priya", "body", &CommentMeta::default());
        assert_eq!(email.subject.chars().count(), 78);
        assert!(!email.subject.contains("..."));

        let over = "b".repeat(56);
        let capped = mention_alert(&over, "Priya", "body", &CommentMeta::default());
        assert_eq!(capped.subject.chars().count(), 78);
        assert!(capped.subject.contains("..."));
    }

    #[test]
    fn test_mention_meta_fallbacks() {
        let email = mention_alert("T", "Priya", "hello", &CommentMeta::default());
        assert!(email.html.contains("just now"));
        assert!(email.html.contains(">P<"));

        let meta = CommentMeta {
            timestamp: Some("2 hours ago".to_string()),
            author_initials: Some("PK".to_string()),
        };
        let email = mention_alert("T", "Priya", "hello", &meta);
        assert!(email.html.contains("2 hours ago"));
        assert!(email.html.contains(">PK<"));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let a = deadline_reminder("T", 3, "d", "desc", "Ongoing", true);
        let b = deadline_reminder("T", 3, "d", "desc", "Ongoing", true);
        assert_eq!(a, b);
    }
}
