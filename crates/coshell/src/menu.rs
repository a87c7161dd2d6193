//! Interactive main menu shown when coshell starts without a subcommand.
//!
//! The menu is plain line-oriented text over any `BufRead`/`Write` pair so
//! it can be driven from tests.

use std::io::{self, BufRead, Write};

use tracing::debug;

/// ANSI sequence that clears the screen and homes the cursor.
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// What the user picked from the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    /// Run the chat server on `port`.
    RunServer { port: u16 },

    /// Run the split-pane UI.
    RunUi,

    /// Leave the program.
    Exit,
}

/// Shows the menu until the user makes a valid choice.
///
/// Invalid selections and unparsable ports redraw the menu with a notice.
/// End of input is treated as [`MenuChoice::Exit`].
///
/// # Errors
///
/// Returns an error if reading input or writing output fails.
pub fn run_menu<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> io::Result<MenuChoice> {
    let mut notice: Option<String> = None;

    loop {
        write!(output, "{CLEAR_SCREEN}")?;
        writeln!(output, "===== CoShell Main Menu =====")?;
        writeln!(output, "1. Run Chat Server")?;
        writeln!(output, "2. Run Client (ToDo + Chat UI)")?;
        writeln!(output, "3. Exit")?;
        if let Some(text) = notice.take() {
            writeln!(output, "{text}")?;
        }
        write!(output, "Select an option: ")?;
        output.flush()?;

        let Some(selection) = read_line(input)? else {
            return Ok(MenuChoice::Exit);
        };
        debug!(selection = %selection, "Menu selection");

        match selection.as_str() {
            "1" => {
                write!(output, "Enter port: ")?;
                output.flush()?;
                let Some(port) = read_line(input)? else {
                    return Ok(MenuChoice::Exit);
                };
                match port.parse::<u16>() {
                    Ok(port) if port != 0 => return Ok(MenuChoice::RunServer { port }),
                    _ => notice = Some(format!("Invalid port: {port}")),
                }
            }
            "2" => return Ok(MenuChoice::RunUi),
            "3" => return Ok(MenuChoice::Exit),
            other => notice = Some(format!("Invalid option: {other}")),
        }
    }
}

/// Reads one trimmed line, or `None` at end of input.
fn read_line<R: BufRead>(input: &mut R) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run(input: &str) -> (MenuChoice, String) {
        let mut reader = Cursor::new(input.as_bytes().to_vec());
        let mut output = Vec::new();
        let choice = run_menu(&mut reader, &mut output).unwrap();
        (choice, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_run_server_with_port() {
        let (choice, output) = run("1\n4000\n");
        assert_eq!(choice, MenuChoice::RunServer { port: 4000 });
        assert!(output.contains("===== CoShell Main Menu ====="));
        assert!(output.contains("Enter port: "));
    }

    #[test]
    fn test_run_ui() {
        assert_eq!(run("2\n").0, MenuChoice::RunUi);
    }

    #[test]
    fn test_exit_and_end_of_input() {
        assert_eq!(run("3\n").0, MenuChoice::Exit);
        assert_eq!(run("").0, MenuChoice::Exit);
        assert_eq!(run("1\n").0, MenuChoice::Exit);
    }

    #[test]
    fn test_invalid_option_reprompts() {
        let (choice, output) = run("7\n2\n");
        assert_eq!(choice, MenuChoice::RunUi);
        assert!(output.contains("Invalid option: 7"));
        assert_eq!(output.matches("===== CoShell Main Menu =====").count(), 2);
    }

    #[test]
    fn test_bad_port_returns_to_menu() {
        let (choice, output) = run("1\nabc\n1\n0\n3\n");
        assert_eq!(choice, MenuChoice::Exit);
        assert!(output.contains("Invalid port: abc"));
        assert!(output.contains("Invalid port: 0"));
    }
}
