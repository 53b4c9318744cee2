//! Small pieces shared by several modules.

use std::sync::Arc;

use rose_core::{User, UserId};
use rose_framework::{BoxError, Namespace, UpdateContext};

/// Longest text a user may store about themselves or others.
pub const MAX_INFO_LEN: usize = 1024;

pub(crate) const NOT_ADMIN: &str = "You need to be an admin to do this.";

/// Replies with [`NOT_ADMIN`] and returns `false` unless the sender
/// administers the current chat.
pub(crate) async fn ensure_admin(ctx: &UpdateContext) -> Result<bool, BoxError> {
    if ctx.sender_is_admin().await? {
        return Ok(true);
    }
    ctx.reply(NOT_ADMIN).await?;
    Ok(false)
}

/// Adapts `async fn(Arc<S>, Arc<UpdateContext>)` into a matcher handler.
pub(crate) fn bind<S, F, Fut>(
    state: &Arc<S>,
    f: F,
) -> impl Fn(Arc<UpdateContext>) -> Fut + Clone + Send + Sync + 'static
where
    S: Send + Sync + 'static,
    F: Fn(Arc<S>, Arc<UpdateContext>) -> Fut + Clone + Send + Sync + 'static,
{
    let state = Arc::clone(state);
    move |ctx| f(Arc::clone(&state), ctx)
}

/// The user a command is aimed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Target {
    pub id: UserId,
    /// Full details, when the update carries them.
    pub user: Option<User>,
}

impl Target {
    /// First name if known, otherwise the numeric id.
    pub fn display_name(&self) -> String {
        match &self.user {
            Some(user) => user.first_name.clone(),
            None => self.id.to_string(),
        }
    }
}

/// Resolves the user a command refers to, plus the remaining text.
///
/// A replied-to message wins, and then all of the argument text is left
/// over. Otherwise the first argument is a numeric id or an `@username`
/// previously seen by the users module.
pub(crate) fn extract_user_and_text(
    ctx: &UpdateContext,
    users: &Namespace,
) -> Option<(Target, String)> {
    if let Some(user) = ctx.replied().and_then(|m| m.from.clone()) {
        return Some((
            Target {
                id: user.id,
                user: Some(user),
            },
            ctx.arg_text().trim().to_string(),
        ));
    }

    let command = ctx.command()?;
    let (first, rest) = command.split_first_arg()?;
    let id = match first.strip_prefix('@') {
        Some(name) => lookup_username(users, name)?,
        None => first.parse().ok()?,
    };
    Some((Target { id, user: None }, rest.trim().to_string()))
}

/// Like [`extract_user_and_text`], ignoring the text.
pub(crate) fn extract_user(ctx: &UpdateContext, users: &Namespace) -> Option<Target> {
    extract_user_and_text(ctx, users).map(|(target, _)| target)
}

/// Key under which the users module indexes a username.
pub(crate) fn username_key(name: &str) -> String {
    format!("username:{}", name.trim_start_matches('@').to_lowercase())
}

fn lookup_username(users: &Namespace, name: &str) -> Option<UserId> {
    users.get::<UserId>(&username_key(name)).ok().flatten()
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use rose_core::testing::RecordingBot;
    use rose_framework::{CommandParser, MemoryStore};
    use std::sync::Arc;

    fn users() -> Namespace {
        let ns = Namespace::new(Arc::new(MemoryStore::new()), "users");
        ns.set(&username_key("@Alice"), &UserId(7)).unwrap();
        ns
    }

    fn ctx(update: rose_core::Update) -> UpdateContext {
        UpdateContext::new(update, RecordingBot::new("rose_bot"), &CommandParser::default())
    }

    #[test]
    fn test_extract_from_reply() {
        let admin = user(1, "Admin");
        let bob = user(8, "Bob");
        let ctx = ctx(group_reply(&admin, "/warn spamming links", &bob));
        let (target, text) = extract_user_and_text(&ctx, &users()).unwrap();
        assert_eq!(target.id, UserId(8));
        assert_eq!(target.display_name(), "Bob");
        assert_eq!(text, "spamming links");
    }

    #[test]
    fn test_extract_from_id_and_username() {
        let admin = user(1, "Admin");
        let users = users();

        let by_id = ctx(group_message(&admin, "/warn 42 flooding"));
        let (target, text) = extract_user_and_text(&by_id, &users).unwrap();
        assert_eq!((target.id, text.as_str()), (UserId(42), "flooding"));

        let by_name = ctx(group_message(&admin, "/warns @alice"));
        assert_eq!(extract_user(&by_name, &users).map(|t| t.id), Some(UserId(7)));

        let unknown = ctx(group_message(&admin, "/warns @nobody"));
        assert_eq!(extract_user(&unknown, &users), None);

        let missing = ctx(group_message(&admin, "/warns"));
        assert_eq!(extract_user(&missing, &users), None);
    }
}
