//! Inline-styled HTML bodies for each notification kind.
//!
//! Kept as plain `format!` builders so the output is byte-stable and easy
//! to assert on in tests. Email clients get inline styles only.

#[allow(clippy::too_many_arguments)]
pub(super) fn status_update_html(
    kind: &str,
    title: &str,
    old_status: &str,
    old_color: &str,
    new_status: &str,
    new_color: &str,
    new_icon: &str,
    changed_by: &str,
    deadline: &str,
    description: &str,
) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<body style="margin:0;padding:0;background-color:#F1F5F9;font-family:Arial,Helvetica,sans-serif;">
  <div style="max-width:600px;margin:24px auto;background-color:#FFFFFF;border-radius:8px;overflow:hidden;">
    <div style="background-color:{new_color};padding:24px;text-align:center;">
      <div style="font-size:36px;">{new_icon}</div>
      <h1 style="color:#FFFFFF;font-size:20px;margin:8px 0 0;">{kind} Status Updated</h1>
    </div>
    <div style="padding:24px;">
      <h2 style="color:#1E293B;font-size:18px;margin:0 0 16px;">{title}</h2>
      <p style="margin:0 0 16px;">
        <span style="display:inline-block;padding:4px 12px;border-radius:12px;background-color:{old_color};color:#FFFFFF;font-size:13px;">{old_status}</span>
        <span style="color:#64748B;margin:0 8px;">&rarr;</span>
        <span style="display:inline-block;padding:4px 12px;border-radius:12px;background-color:{new_color};color:#FFFFFF;font-size:13px;">{new_status}</span>
      </p>
      <p style="color:#475569;font-size:14px;margin:0 0 8px;"><strong>Changed by:</strong> {changed_by}</p>
      <p style="color:#475569;font-size:14px;margin:0 0 8px;"><strong>Deadline:</strong> {deadline}</p>
      <p style="color:#475569;font-size:14px;margin:0;"><strong>Description:</strong> {description}</p>
    </div>
    <div style="padding:16px 24px;background-color:#F8FAFC;text-align:center;">
      <p style="color:#94A3B8;font-size:12px;margin:0;">You are receiving this because you work on this {kind_lower}.</p>
    </div>
  </div>
</body>
</html>"#,
        new_color = new_color,
        new_icon = new_icon,
        kind = kind,
        title = title,
        old_color = old_color,
        old_status = old_status,
        new_status = new_status,
        changed_by = changed_by,
        deadline = deadline,
        description = description,
        kind_lower = kind.to_lowercase(),
    )
}

#[allow(clippy::too_many_arguments)]
pub(super) fn deadline_reminder_html(
    kind: &str,
    title: &str,
    days_before: u32,
    plural: &str,
    deadline: &str,
    description: &str,
    task_status: &str,
    status_color: &str,
    theme_color: &str,
    theme_icon: &str,
    theme_label: &str,
) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<body style="margin:0;padding:0;background-color:#F1F5F9;font-family:Arial,Helvetica,sans-serif;">
  <div style="max-width:600px;margin:24px auto;background-color:#FFFFFF;border-radius:8px;overflow:hidden;">
    <div style="background-color:{theme_color};padding:24px;text-align:center;">
      <div style="font-size:36px;">{theme_icon}</div>
      <h1 style="color:#FFFFFF;font-size:20px;margin:8px 0 0;">{theme_label}: Deadline Approaching</h1>
    </div>
    <div style="padding:24px;">
      <h2 style="color:#1E293B;font-size:18px;margin:0 0 8px;">{title}</h2>
      <p style="color:{theme_color};font-size:16px;font-weight:bold;margin:0 0 16px;">Due in {days_before} day{plural}</p>
      <p style="color:#475569;font-size:14px;margin:0 0 8px;"><strong>Deadline:</strong> {deadline}</p>
      <p style="color:#475569;font-size:14px;margin:0 0 8px;"><strong>Status:</strong>
        <span style="display:inline-block;padding:2px 10px;border-radius:12px;background-color:{status_color};color:#FFFFFF;font-size:13px;">{task_status}</span>
      </p>
      <p style="color:#475569;font-size:14px;margin:0;"><strong>Description:</strong> {description}</p>
    </div>
    <div style="padding:16px 24px;background-color:#F8FAFC;text-align:center;">
      <p style="color:#94A3B8;font-size:12px;margin:0;">You are receiving this because you work on this {kind_lower}.</p>
    </div>
  </div>
</body>
</html>"#,
        theme_color = theme_color,
        theme_icon = theme_icon,
        theme_label = theme_label,
        title = title,
        days_before = days_before,
        plural = plural,
        deadline = deadline,
        status_color = status_color,
        task_status = task_status,
        description = description,
        kind_lower = kind.to_lowercase(),
    )
}

#[allow(clippy::too_many_arguments)]
pub(super) fn overdue_alert_html(
    kind: &str,
    title: &str,
    days_overdue: i64,
    day_word: &str,
    deadline: &str,
    description: &str,
    task_status: &str,
    status_color: &str,
    theme_color: &str,
    theme_icon: &str,
    theme_label: &str,
    message: &str,
) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<body style="margin:0;padding:0;background-color:#F1F5F9;font-family:Arial,Helvetica,sans-serif;">
  <div style="max-width:600px;margin:24px auto;background-color:#FFFFFF;border-radius:8px;overflow:hidden;">
    <div style="background-color:{theme_color};padding:24px;text-align:center;">
      <div style="font-size:36px;">{theme_icon}</div>
      <h1 style="color:#FFFFFF;font-size:20px;margin:8px 0 0;">{theme_label}</h1>
    </div>
    <div style="padding:24px;">
      <h2 style="color:#1E293B;font-size:18px;margin:0 0 8px;">{title}</h2>
      <p style="color:{theme_color};font-size:16px;font-weight:bold;margin:0 0 12px;">{days_overdue} {day_word} past deadline</p>
      <p style="color:#475569;font-size:14px;margin:0 0 16px;">{message}</p>
      <p style="color:#475569;font-size:14px;margin:0 0 8px;"><strong>Was due:</strong> {deadline}</p>
      <p style="color:#475569;font-size:14px;margin:0 0 8px;"><strong>Status:</strong>
        <span style="display:inline-block;padding:2px 10px;border-radius:12px;background-color:{status_color};color:#FFFFFF;font-size:13px;">{task_status}</span>
      </p>
      <p style="color:#475569;font-size:14px;margin:0;"><strong>Description:</strong> {description}</p>
    </div>
    <div style="padding:16px 24px;background-color:#F8FAFC;text-align:center;">
      <p style="color:#94A3B8;font-size:12px;margin:0;">You are receiving this because you work on this {kind_lower}.</p>
    </div>
  </div>
</body>
</html>"#,
        theme_color = theme_color,
        theme_icon = theme_icon,
        theme_label = theme_label,
        title = title,
        days_overdue = days_overdue,
        day_word = day_word,
        message = message,
        deadline = deadline,
        status_color = status_color,
        task_status = task_status,
        description = description,
        kind_lower = kind.to_lowercase(),
    )
}

pub(super) fn mention_alert_html(
    title: &str,
    author_name: &str,
    initials: &str,
    timestamp: &str,
    comment_body: &str,
) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<body style="margin:0;padding:0;background-color:#F1F5F9;font-family:Arial,Helvetica,sans-serif;">
  <div style="max-width:600px;margin:24px auto;background-color:#FFFFFF;border-radius:8px;overflow:hidden;">
    <div style="background-color:#6366F1;padding:24px;text-align:center;">
      <div style="font-size:36px;">&#128172;</div>
      <h1 style="color:#FFFFFF;font-size:20px;margin:8px 0 0;">You were mentioned</h1>
    </div>
    <div style="padding:24px;">
      <h2 style="color:#1E293B;font-size:18px;margin:0 0 16px;">{title}</h2>
      <div style="background-color:#F8FAFC;border-left:4px solid #6366F1;border-radius:4px;padding:16px;">
        <table cellpadding="0" cellspacing="0" style="margin-bottom:8px;">
          <tr>
            <td style="width:40px;height:40px;border-radius:20px;background-color:#6366F1;color:#FFFFFF;font-size:16px;text-align:center;vertical-align:middle;">{initials}</td>
            <td style="padding-left:12px;">
              <span style="color:#1E293B;font-size:14px;font-weight:bold;">{author_name}</span><br>
              <span style="color:#94A3B8;font-size:12px;">{timestamp}</span>
            </td>
          </tr>
        </table>
        <p style="color:#475569;font-size:14px;margin:8px 0 0;">{comment_body}</p>
      </div>
    </div>
    <div style="padding:16px 24px;background-color:#F8FAFC;text-align:center;">
      <p style="color:#94A3B8;font-size:12px;margin:0;">{author_name} mentioned you in a comment on this task.</p>
    </div>
  </div>
</body>
</html>"#,
        title = title,
        initials = initials,
        author_name = author_name,
        timestamp = timestamp,
        comment_body = comment_body,
    )
}
