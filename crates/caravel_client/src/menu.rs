//! Generic console menu dispatcher.
//!
//! A menu is an ordered list of described actions rebuilt on every
//! render, so labels can reflect live state. Entries are numbered
//! deterministically from 1; entry 0 is always the reserved exit. Menus
//! compose: an action may itself show another menu over the same console
//! reader, so exactly one loop reads the console at a time.

use std::io::{self, BufRead, BufReader, Write};

/// What a dispatched action tells the enclosing loop to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOutcome {
    /// Redisplay the menu and keep going.
    Continue,
    /// Leave this menu.
    Exit,
}

/// One described action.
pub struct MenuItem<C> {
    label: String,
    action: Box<dyn Fn(&mut C, &mut Console) -> MenuOutcome>,
}

impl<C> MenuItem<C> {
    /// Creates an item.
    pub fn new(
        label: impl Into<String>,
        action: impl Fn(&mut C, &mut Console) -> MenuOutcome + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            action: Box::new(action),
        }
    }

    /// Returns the item label.
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// A menu over a context `C`.
pub struct Menu<C> {
    title: String,
    exit_label: String,
    build: Box<dyn Fn(&C) -> Vec<MenuItem<C>>>,
}

impl<C> Menu<C> {
    /// Creates a menu. `build` runs before every render.
    pub fn new(
        title: impl Into<String>,
        exit_label: impl Into<String>,
        build: impl Fn(&C) -> Vec<MenuItem<C>> + 'static,
    ) -> Self {
        Self {
            title: title.into(),
            exit_label: exit_label.into(),
            build: Box::new(build),
        }
    }

    /// Renders one frame of the menu as lines of text.
    fn render(&self, items: &[MenuItem<C>]) -> Vec<String> {
        let mut lines = Vec::with_capacity(items.len() + 4);
        lines.push("** *************************************** **".to_string());
        lines.push(format!("** {}:", self.title));
        for (index, item) in items.iter().enumerate() {
            lines.push(format!("      {}. {}", index + 1, item.label()));
        }
        lines.push(format!("      0. {}", self.exit_label));
        lines.push("** Please enter your choice:".to_string());
        lines
    }

    /// Runs the menu loop until the exit entry is chosen or the console
    /// reaches end of input.
    pub fn show(&self, ctx: &mut C, console: &mut Console) {
        loop {
            let items = (self.build)(ctx);
            for line in self.render(&items) {
                println!("{line}");
            }
            let Some(token) = console.read_token() else {
                // End of input behaves like exit so the loop cannot spin.
                return;
            };
            match token.parse::<usize>() {
                Ok(0) => return,
                Ok(n) if n <= items.len() => {
                    if (items[n - 1].action)(ctx, console) == MenuOutcome::Exit {
                        return;
                    }
                }
                _ => {
                    tracing::warn!(choice = %token, "invalid choice");
                    println!("No valid option: `{token}`. Please try again.");
                }
            }
        }
    }
}

/// The single console input source shared by every menu.
pub struct Console {
    input: Box<dyn BufRead>,
}

impl Console {
    /// A console reading from stdin.
    pub fn stdin() -> Self {
        Self {
            input: Box::new(BufReader::new(io::stdin())),
        }
    }

    /// A console reading from any buffered reader.
    pub fn from_reader(reader: impl BufRead + 'static) -> Self {
        Self {
            input: Box::new(reader),
        }
    }

    /// Reads one trimmed input token. `None` at end of input.
    pub fn read_token(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim().to_string()),
            Err(error) => {
                tracing::error!(%error, "error reading console input");
                None
            }
        }
    }

    /// Prompts for and reads one line of input.
    pub fn prompt(&mut self, prompt: &str) -> Option<String> {
        print!("{prompt} ");
        let _ = io::stdout().flush();
        self.read_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct Counters {
        first: usize,
        second: usize,
    }

    fn menu() -> Menu<Counters> {
        Menu::new("Main Menu", "Exit", |_ctx| {
            vec![
                MenuItem::new("First action", |c: &mut Counters, _| {
                    c.first += 1;
                    MenuOutcome::Continue
                }),
                MenuItem::new("Second action", |c: &mut Counters, _| {
                    c.second += 1;
                    MenuOutcome::Continue
                }),
            ]
        })
    }

    fn console(input: &str) -> Console {
        Console::from_reader(Cursor::new(input.to_string()))
    }

    #[test]
    fn numbering_is_deterministic() {
        let menu = menu();
        let items = (menu.build)(&Counters { first: 0, second: 0 });
        let lines = menu.render(&items);

        assert!(lines[1].contains("Main Menu"));
        assert!(lines[2].contains("1. First action"));
        assert!(lines[3].contains("2. Second action"));
        assert!(lines[4].contains("0. Exit"));

        // Rebuilding renders identically.
        let again = menu.render(&(menu.build)(&Counters { first: 3, second: 9 }));
        assert_eq!(lines, again);
    }

    #[test]
    fn dispatch_and_exit() {
        let menu = menu();
        let mut ctx = Counters { first: 0, second: 0 };
        menu.show(&mut ctx, &mut console("2\n2\n1\n0\n"));
        assert_eq!(ctx.first, 1);
        assert_eq!(ctx.second, 2);
    }

    #[test]
    fn invalid_choices_redisplay() {
        let menu = menu();
        let mut ctx = Counters { first: 0, second: 0 };
        // Out-of-range, junk, and empty input are all rejected.
        menu.show(&mut ctx, &mut console("9\nx\n\n1\n0\n"));
        assert_eq!(ctx.first, 1);
        assert_eq!(ctx.second, 0);
    }

    #[test]
    fn end_of_input_exits() {
        let menu = menu();
        let mut ctx = Counters { first: 0, second: 0 };
        menu.show(&mut ctx, &mut console("1\n"));
        assert_eq!(ctx.first, 1);
    }

    #[test]
    fn actions_can_exit_and_nest() {
        let menu: Menu<Vec<String>> = Menu::new("Outer", "Exit", |_| {
            vec![
                MenuItem::new("Enter submenu", |log: &mut Vec<String>, console| {
                    let inner: Menu<Vec<String>> = Menu::new("Inner", "Back", |_| {
                        vec![MenuItem::new("Record", |log: &mut Vec<String>, _| {
                            log.push("recorded".into());
                            MenuOutcome::Continue
                        })]
                    });
                    inner.show(log, console);
                    MenuOutcome::Continue
                }),
                MenuItem::new("Leave outer", |_: &mut Vec<String>, _| MenuOutcome::Exit),
            ]
        });

        let mut log = Vec::new();
        // Enter the submenu, record, back out; repeat; then leave.
        menu.show(&mut log, &mut console("1\n1\n0\n1\n1\n0\n2\n"));
        assert_eq!(log, vec!["recorded".to_string(), "recorded".to_string()]);
    }
}
