use std::io::{self, BufRead, Write};

/// Line-oriented prompts over any reader/writer pair.
pub(crate) struct Console<R, W> {
    input: R,
    pub out: W,
}

impl Console<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, out: W) -> Self {
        Self { input, out }
    }

    /// Prints `label` and reads one trimmed line. `None` at end of input.
    pub fn ask(&mut self, label: &str) -> io::Result<Option<String>> {
        write!(self.out, "{label}")?;
        self.out.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Only an explicit `y` confirms.
    pub fn confirm(&mut self, label: &str) -> io::Result<bool> {
        let answer = self.ask(&format!("{label} (y/n): "))?;
        Ok(answer.is_some_and(|a| a.eq_ignore_ascii_case("y")))
    }

    /// Reads a 1-based choice in `1..=count` and returns it 0-based.
    pub fn choose(&mut self, label: &str, count: usize) -> io::Result<Option<usize>> {
        let Some(answer) = self.ask(&format!("{label} (1-{count}): "))? else {
            return Ok(None);
        };
        match answer.parse::<usize>() {
            Ok(n) if (1..=count).contains(&n) => Ok(Some(n - 1)),
            Ok(_) => {
                writeln!(self.out, "[WARNING] Invalid choice.")?;
                Ok(None)
            }
            Err(_) => {
                writeln!(self.out, "[WARNING] Invalid input.")?;
                Ok(None)
            }
        }
    }
}
