//! Line-oriented terminal front end.
//!
//! Stands in for the kiosk's touch screen: screens and notices are printed
//! to stdout, and each input line is one user action.  Commands are parsed
//! by [`parse_command`] and dispatched to the [`KioskController`] one at a
//! time, so an action always finishes before the next line is read.

use std::io::{self, Write};
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use ::console::Term;
use pos_core::{Role, RoleParseError};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tracing::warn;

use crate::application::gate::TokenSources;
use crate::application::kiosk::{ActionStatus, KioskController};
use crate::application::ports::{PosApi, ServerLocator};
use crate::application::state_machine::{KioskState, Notice, Screen, ScreenSink};
use crate::infrastructure::token_source::Prompt;

const HELP: &str = "\
commands:
  unlock <kiosk_staff|teacher|admin>   unlock with the role password
  scan                                 unlock with an RFID card
  items                                reload and list items
  add <n>                              add item #n to the cart
  cart                                 show the cart
  checkout                             sell the cart to the scanned user
  charge <user_id> <amount>            manual charge (teacher, admin)
  new-item <price> <name>              add a catalogue item (admin)
  info                                 show the server address
  lock                                 lock the kiosk
  retry                                rediscover the server after an error
  help                                 this text
  quit                                 exit";

// ── Commands ──────────────────────────────────────────────────────────────────

/// One parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Unlock(Role),
    Scan,
    Items,
    /// Zero-based index into the item list.
    Add(usize),
    Cart,
    Checkout,
    Charge { user_id: u32, amount: f64 },
    NewItem { price: f64, name: String },
    Info,
    Lock,
    Retry,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("unknown command '{0}' (type 'help')")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error(transparent)]
    Role(#[from] RoleParseError),
}

/// Parses one input line.  Returns `Ok(None)` for a blank line.
pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "unlock" => {
            let role = words.next().ok_or(CommandError::Usage("unlock <role>"))?;
            Command::Unlock(Role::from_str(role)?)
        }
        "scan" => Command::Scan,
        "items" => Command::Items,
        "add" => {
            let n: usize = parse_arg(words.next(), "add <n>")?;
            if n == 0 {
                return Err(CommandError::Usage("add <n>"));
            }
            Command::Add(n - 1)
        }
        "cart" => Command::Cart,
        "checkout" => Command::Checkout,
        "charge" => {
            const USAGE: &str = "charge <user_id> <amount>";
            let user_id = parse_arg(words.next(), USAGE)?;
            let amount = parse_arg(words.next(), USAGE)?;
            Command::Charge { user_id, amount }
        }
        "new-item" => {
            const USAGE: &str = "new-item <price> <name>";
            let price = parse_arg(words.next(), USAGE)?;
            let name = words.collect::<Vec<_>>().join(" ");
            if name.is_empty() {
                return Err(CommandError::Usage(USAGE));
            }
            Command::NewItem { price, name }
        }
        "info" => Command::Info,
        "lock" => Command::Lock,
        "retry" => Command::Retry,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_owned())),
    };
    Ok(Some(command))
}

fn parse_arg<T: FromStr>(word: Option<&str>, usage: &'static str) -> Result<T, CommandError> {
    word.and_then(|w| w.parse().ok())
        .ok_or(CommandError::Usage(usage))
}

// ── Input ─────────────────────────────────────────────────────────────────────

/// Shared stdin reader.  Cloned into the manual token source so that
/// commands and prompts read from the same line stream.
#[derive(Clone)]
pub struct ConsoleInput {
    lines: Arc<Mutex<Lines<BufReader<Stdin>>>>,
}

impl ConsoleInput {
    pub fn stdin() -> Self {
        Self {
            lines: Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()).lines())),
        }
    }
}

impl Default for ConsoleInput {
    fn default() -> Self {
        Self::stdin()
    }
}

#[async_trait]
impl Prompt for ConsoleInput {
    async fn prompt(&self, label: &str) -> io::Result<Option<String>> {
        print!("{label}");
        io::stdout().flush()?;
        self.lines.lock().await.next_line().await
    }

    /// Reads with echo off when stdin is a terminal; piped input is read
    /// as a plain line.
    async fn prompt_secret(&self, label: &str) -> io::Result<Option<String>> {
        if !Term::stdout().is_term() {
            return self.prompt(label).await;
        }
        // Held so no other prompt reads stdin meanwhile.
        let _lines = self.lines.lock().await;
        let label = label.to_string();
        tokio::task::spawn_blocking(move || {
            let term = Term::stdout();
            term.write_str(&label)?;
            term.read_secure_line().map(Some)
        })
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
    }
}

// ── Output ────────────────────────────────────────────────────────────────────

/// Prints screens and notices to stdout.
#[derive(Debug, Default)]
pub struct ConsoleScreen;

impl ScreenSink for ConsoleScreen {
    fn show(&mut self, screen: Screen) {
        match screen {
            Screen::Lock => println!("\n=== LOCKED ===  'unlock <role>' or 'scan'"),
            Screen::Main => println!("\n=== KIOSK ===  'items', 'add <n>', 'checkout', 'lock'"),
            Screen::Error => {
                println!("\n=== SERVER UNAVAILABLE ===  type 'retry' to search again")
            }
        }
    }

    fn notify(&mut self, notice: Notice) {
        match notice {
            Notice::Info(text) => println!("{text}"),
            Notice::Warning(text) => println!("! {text}"),
        }
    }
}

// ── Loop ──────────────────────────────────────────────────────────────────────

/// Reads commands until `quit` or end of input.
///
/// # Errors
///
/// Only a failure to read stdin ends the loop with an error.
pub async fn run_console<A, L>(
    kiosk: &mut KioskController<A, L, ConsoleScreen>,
    input: &ConsoleInput,
    sources: &mut TokenSources,
) -> anyhow::Result<()>
where
    A: PosApi,
    L: ServerLocator,
{
    loop {
        let Some(line) = input.prompt("> ").await? else {
            return Ok(());
        };
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        match command {
            Command::Quit => return Ok(()),
            Command::Help => println!("{HELP}"),
            Command::Unlock(role) => {
                if kiosk.state() != KioskState::Locked {
                    println!("lock the kiosk first");
                    continue;
                }
                let password = input.prompt_secret("Password: ").await?.unwrap_or_default();
                // A mismatch shows nothing; the lock screen simply stays.
                kiosk.unlock_with_password(role, &password).await;
            }
            Command::Scan => {
                kiosk.scan_token(sources).await;
            }
            Command::Items => {
                if kiosk.refresh_items().await == ActionStatus::Completed {
                    print_items(kiosk);
                }
            }
            Command::Add(index) => {
                kiosk.add_to_cart(index);
            }
            Command::Cart => print_cart(kiosk),
            Command::Checkout => {
                kiosk.checkout().await;
            }
            Command::Charge { user_id, amount } => {
                kiosk.manual_charge(user_id, amount).await;
            }
            Command::NewItem { price, name } => {
                if kiosk.add_item(&name, price).await == ActionStatus::Completed {
                    print_items(kiosk);
                }
            }
            Command::Info => {
                kiosk.server_info().await;
            }
            Command::Lock => {
                kiosk.lock();
            }
            Command::Retry => {
                if kiosk.retry().await == ActionStatus::Ignored {
                    warn!("retry requested outside error mode");
                }
            }
        }
    }
}

fn print_items<A, L>(kiosk: &KioskController<A, L, ConsoleScreen>)
where
    A: PosApi,
    L: ServerLocator,
{
    if kiosk.items().is_empty() {
        println!("(no items)");
    }
    for (n, item) in kiosk.items().iter().enumerate() {
        println!("{:>3}. {:<24} ${:.2}", n + 1, item.name, item.price);
    }
}

fn print_cart<A, L>(kiosk: &KioskController<A, L, ConsoleScreen>)
where
    A: PosApi,
    L: ServerLocator,
{
    let Some(session) = kiosk.session() else {
        println!("kiosk is locked");
        return;
    };
    match session.user() {
        Some(user) => println!("customer: {} (#{})", user.username, user.id),
        None => println!("customer: none (scan a card to sell)"),
    }
    for item in session.cart() {
        println!("  {:<24} ${:.2}", item.name, item.price);
    }
    println!("total: ${:.2}", session.cart_total());
}

// ── Tests ─────────────────────────────────────────────────────────────────────
