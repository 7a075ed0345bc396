use sandbox_orchestrator::operator::{self, Input, Operator};
use snafu::ResultExt;
use std::io::{BufRead, BufReader, Stdin, Stdout, Write};

/// Asks questions on a line-oriented terminal. Options are numbered. A single choice may be given
/// as the number or the option itself; multiple choices are given as numbers only, because option
/// labels contain commas and spaces. Invalid answers are reported and the question is asked again.
pub(crate) struct TerminalOperator<R, W> {
    reader: R,
    writer: W,
}

impl TerminalOperator<BufReader<Stdin>, Stdout> {
    pub(crate) fn stdio() -> Self {
        Self::new(BufReader::new(std::io::stdin()), std::io::stdout())
    }
}

impl<R, W> TerminalOperator<R, W>
where
    R: BufRead,
    W: Write,
{
    pub(crate) fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    fn ask(&mut self, prompt: &str, message: &str) -> operator::Result<String> {
        write!(self.writer, "? {} ", prompt).context(operator::IoSnafu)?;
        self.writer.flush().context(operator::IoSnafu)?;
        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .context(operator::IoSnafu)?;
        if read == 0 {
            return operator::ClosedSnafu { message }.fail();
        }
        Ok(line.trim().to_string())
    }

    fn say(&mut self, text: &str) -> operator::Result<()> {
        writeln!(self.writer, "{}", text).context(operator::IoSnafu)
    }

    fn list(&mut self, options: &[String]) -> operator::Result<()> {
        for (index, option) in options.iter().enumerate() {
            writeln!(self.writer, "  {}) {}", index + 1, option).context(operator::IoSnafu)?;
        }
        Ok(())
    }
}

/// Parse a 1-based option number.
fn option_number(token: &str, options: &[String]) -> Option<usize> {
    token
        .parse::<usize>()
        .ok()
        .filter(|number| *number >= 1 && *number <= options.len())
        .map(|number| number - 1)
}

/// Parse a whole answer as an option number or an exact option label.
fn option_index(answer: &str, options: &[String]) -> Option<usize> {
    option_number(answer, options).or_else(|| options.iter().position(|option| option == answer))
}

fn parse_confirm(answer: &str) -> Option<bool> {
    match answer.to_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

impl<R, W> Operator for TerminalOperator<R, W>
where
    R: BufRead,
    W: Write,
{
    fn input(&mut self, input: &Input) -> operator::Result<String> {
        let prompt = match &input.default {
            Some(default) => format!("{} ({})", input.message, default),
            None => input.message.clone(),
        };
        loop {
            let mut answer = self.ask(&prompt, &input.message)?;
            if answer.is_empty() {
                answer = input.default.clone().unwrap_or_default();
            }
            if input.required && answer.is_empty() {
                self.say("A value is required.")?;
                continue;
            }
            return Ok(answer);
        }
    }

    fn confirm(&mut self, message: &str, default: Option<bool>) -> operator::Result<bool> {
        let hint = match default {
            Some(true) => "[Y/n]",
            Some(false) => "[y/N]",
            None => "[y/n]",
        };
        let prompt = format!("{} {}", message, hint);
        loop {
            let answer = self.ask(&prompt, message)?;
            let choice = if answer.is_empty() {
                default
            } else {
                parse_confirm(&answer)
            };
            match choice {
                Some(choice) => return Ok(choice),
                None => self.say("Please answer 'y' or 'n'.")?,
            }
        }
    }

    fn select(&mut self, message: &str, options: &[String]) -> operator::Result<String> {
        self.say(&format!("? {}", message))?;
        self.list(options)?;
        loop {
            let answer = self.ask("Enter a number:", message)?;
            match option_index(&answer, options).and_then(|index| options.get(index)) {
                Some(option) => return Ok(option.clone()),
                None => self.say(&format!(
                    "'{}' is not an option, enter a number between 1 and {}.",
                    answer,
                    options.len()
                ))?,
            }
        }
    }

    fn multi_select(
        &mut self,
        message: &str,
        options: &[String],
    ) -> operator::Result<Vec<String>> {
        self.say(&format!("? {}", message))?;
        self.list(options)?;
        'ask: loop {
            let answer = self.ask("Enter numbers separated by commas:", message)?;
            let mut selection: Vec<String> = Vec::new();
            for token in answer
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|token| !token.is_empty())
            {
                match option_number(token, options).and_then(|index| options.get(index)) {
                    Some(option) => {
                        if !selection.contains(option) {
                            selection.push(option.clone());
                        }
                    }
                    None => {
                        self.say(&format!(
                            "'{}' is not an option number between 1 and {}.",
                            token,
                            options.len()
                        ))?;
                        continue 'ask;
                    }
                }
            }
            return Ok(selection);
        }
    }
}
