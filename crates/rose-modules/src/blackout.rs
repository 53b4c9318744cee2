//! `/blackout`: rewrites latin letters as negative circled letters.

use std::sync::Arc;

use rose_framework::{BoxError, Module, ModuleContext, ModuleDescriptor, UpdateContext, on_command};

pub const BLACKOUT: ModuleDescriptor = ModuleDescriptor::new("blackout", create);

const HELP: &str = " - /blackout <text>: rewrite text in 🅑🅛🅐🅒🅚 letters. \
Reply to a message to convert its text.";

const USAGE: &str = "❗ Provide some text or reply to a message to blackout.";

/// U+1F150, NEGATIVE CIRCLED LATIN CAPITAL LETTER A.
const CIRCLED_A: u32 = 0x1F150;

fn create(_: &ModuleContext) -> Result<Module, BoxError> {
    Ok(Module::new("blackout")
        .display_name("Black Out")
        .help(HELP)
        .matcher(on_command("blackout").handler(blackout)))
}

async fn blackout(ctx: Arc<UpdateContext>) -> Result<(), BoxError> {
    let own = ctx.arg_text().trim();
    let text = if own.is_empty() {
        ctx.replied().map(|m| m.text_or_empty().trim()).unwrap_or_default()
    } else {
        own
    };

    if text.is_empty() {
        ctx.reply(USAGE).await?;
        return Ok(());
    }
    ctx.reply(&convert(text)).await?;
    Ok(())
}

/// Maps `a-z` (either case) to 🅐–🅩 and leaves everything else alone.
pub fn convert(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_ascii_alphabetic() {
                let offset = u32::from(c.to_ascii_lowercase()) - u32::from('a');
                char::from_u32(CIRCLED_A + offset).unwrap_or(c)
            } else {
                c
            }
        })
        .collect()
}
