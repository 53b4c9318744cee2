//! `/shout`: spreads text out across a square.

use std::sync::Arc;

use rose_framework::{BoxError, Module, ModuleContext, ModuleDescriptor, UpdateContext, on_command};

pub const SHOUT: ModuleDescriptor = ModuleDescriptor::new("shout", create);

const HELP: &str = " - /shout <keyword>: write anything you want to give loud shout.";

const USAGE: &str = "Please provide text to shout. Usage: /shout <text>";

fn create(_: &ModuleContext) -> Result<Module, BoxError> {
    Ok(Module::new("shout")
        .display_name("Shout")
        .help(HELP)
        .matcher(on_command("shout").handler(shout)))
}

async fn shout(ctx: Arc<UpdateContext>) -> Result<(), BoxError> {
    let text = ctx.arg_text().trim();
    if text.is_empty() {
        ctx.reply(USAGE).await?;
        return Ok(());
    }
    ctx.reply(&format!("```{}```", render(text))).await?;
    Ok(())
}

/// The text spaced out on the first line, then each following character
/// repeated at both ends of a widening gap.
pub fn render(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut lines = Vec::with_capacity(chars.len());

    lines.push(
        chars
            .iter()
            .map(char::to_string)
            .collect::<Vec<_>>()
            .join(" "),
    );
    for (i, c) in chars.iter().enumerate().skip(1) {
        lines.push(format!("{c}{}{c}", " ".repeat(2 * i - 1)));
    }
    lines.join("\n")
}
