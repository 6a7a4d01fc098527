use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use pushkit_core::{DialogChoice, DialogPrompt, UpdateDialog};

/// Presents update prompts on the controlling terminal.
pub(crate) struct TerminalDialog;

impl UpdateDialog for TerminalDialog {
    fn present(&self, prompt: &DialogPrompt) -> Result<DialogChoice> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        present_prompt(prompt, &mut stdin.lock(), &mut stdout.lock())
    }
}

/// Writes the prompt and reads answers until one names a button, either by
/// its number or its label. End of input picks the first button, which for
/// optional updates is the ignore button.
pub(crate) fn present_prompt(
    prompt: &DialogPrompt,
    input: &mut dyn BufRead,
    output: &mut dyn Write,
) -> Result<DialogChoice> {
    writeln!(output, "{}", prompt.title).context("failed writing update prompt")?;
    writeln!(output, "{}", prompt.message).context("failed writing update prompt")?;

    let choices = prompt
        .buttons
        .iter()
        .enumerate()
        .map(|(index, button)| format!("[{}] {}", index + 1, button.label))
        .collect::<Vec<_>>()
        .join("  ");

    loop {
        write!(output, "{choices}: ").context("failed writing update prompt")?;
        output.flush().context("failed flushing update prompt")?;

        let mut answer = String::new();
        let read = input
            .read_line(&mut answer)
            .context("failed reading update prompt answer")?;
        if read == 0 {
            writeln!(output).context("failed writing update prompt")?;
            return Ok(prompt
                .buttons
                .first()
                .map(|button| button.choice)
                .unwrap_or(DialogChoice::Install));
        }

        if let Some(choice) = match_answer(prompt, answer.trim()) {
            return Ok(choice);
        }
        writeln!(output, "unrecognized answer: '{}'", answer.trim())
            .context("failed writing update prompt")?;
    }
}

fn match_answer(prompt: &DialogPrompt, answer: &str) -> Option<DialogChoice> {
    if answer.is_empty() {
        return None;
    }
    if let Ok(number) = answer.parse::<usize>() {
        return number
            .checked_sub(1)
            .and_then(|index| prompt.buttons.get(index))
            .map(|button| button.choice);
    }
    prompt
        .buttons
        .iter()
        .find(|button| button.label.eq_ignore_ascii_case(answer))
        .map(|button| button.choice)
}
