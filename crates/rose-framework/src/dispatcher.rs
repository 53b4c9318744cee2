//! Update dispatcher.
//!
//! The [`Dispatcher`] owns every registered [`Matcher`] and routes each
//! incoming update through them:
//!
//! 1. An [`UpdateContext`] is built, parsing the command once
//! 2. Matchers run by ascending group, in registration order within a group
//! 3. Dispatch stops after a blocking matcher matched, or as soon as a
//!    handler called `stop_propagation`
//!
//! ```rust,ignore
//! let mut dispatcher = Dispatcher::new(CommandParser::with_excl(true));
//! dispatcher.add(on_migration().group(i32::MIN).block(true).handler(migrate));
//! dispatcher.add(on_command("help").handler(help));
//! dispatcher.add(on_message().group(4).handler(log_user));
//! ```

use std::sync::Arc;

use tracing::{Instrument, debug, debug_span};

use crate::command::CommandParser;
use crate::context::UpdateContext;
use crate::matcher::Matcher;
use rose_core::{BoxedBot, Update};

#[derive(Default, Clone)]
pub struct Dispatcher {
    matchers: Vec<Matcher>,
    parser: CommandParser,
}

impl Dispatcher {
    pub fn new(parser: CommandParser) -> Self {
        Self {
            matchers: Vec::new(),
            parser,
        }
    }

    /// Adds a matcher, keeping matchers ordered by group.
    ///
    /// Within a group, matchers keep the order they were added in.
    pub fn add(&mut self, matcher: Matcher) {
        let pos = self
            .matchers
            .partition_point(|m| m.get_group() <= matcher.get_group());
        self.matchers.insert(pos, matcher);
    }

    /// Adds a matcher (builder pattern).
    pub fn with(mut self, matcher: Matcher) -> Self {
        self.add(matcher);
        self
    }

    pub fn extend(&mut self, matchers: impl IntoIterator<Item = Matcher>) {
        for matcher in matchers {
            self.add(matcher);
        }
    }

    pub fn matcher_count(&self) -> usize {
        self.matchers.len()
    }

    pub fn parser(&self) -> &CommandParser {
        &self.parser
    }

    /// Dispatches `update`; returns `true` if any matcher matched.
    pub async fn dispatch(&self, update: Update, bot: BoxedBot) -> bool {
        let span = debug_span!("dispatch", update = update.kind());
        self.run(update, bot).instrument(span).await
    }

    async fn run(&self, update: Update, bot: BoxedBot) -> bool {
        let ctx = Arc::new(UpdateContext::new(update, bot, &self.parser));
        let mut any_matched = false;

        for matcher in &self.matchers {
            if !ctx.is_propagating() {
                debug!("Propagation stopped, ending dispatch");
                break;
            }
            if matcher.execute(Arc::clone(&ctx)).await {
                any_matched = true;

                if matcher.is_blocking() {
                    debug!(
                        matcher = matcher.get_name().unwrap_or("unnamed"),
                        "Blocking matcher matched, stopping dispatch"
                    );
                    break;
                }
            }
        }

        any_matched
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("matcher_count", &self.matchers.len())
            .field("prefixes", &self.parser.prefixes())
            .finish()
    }
}
