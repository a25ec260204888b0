//! Line-oriented terminal front end.

use alloy::primitives::Address;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, Lines};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::app::{AtmApp, TxOutcome};
use crate::error::AtmError;
use crate::state::AppSnapshot;
use crate::transaction::TxKind;
use crate::view::View;
use crate::wallet::ConsentPrompt;

pub const HELP: &str = "\
Commands:
  connect             connect your wallet
  balance             refresh your balance
  deposit <amount>    deposit at least 25 ETH
  withdraw <amount>   withdraw at least 20 ETH
  faq                 list the questions
  select <question>   show the answer to a question (text or number)
  remove <number>     remove a question from the list
  status              show everything
  help                show this help
  quit                leave the ATM";

/// Input lines shared between the command loop and the consent prompt.
pub type SharedInput<R> = Arc<Mutex<Lines<R>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connect,
    Balance,
    Deposit(String),
    Withdraw(String),
    Faq,
    Select(String),
    Remove(String),
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown command '{0}'. Type 'help' for the list of commands.")]
    Unknown(String),

    #[error("Usage: {0}")]
    MissingArgument(&'static str),
}

impl Command {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };

        let required = |usage: &'static str| {
            if rest.is_empty() {
                Err(CommandError::MissingArgument(usage))
            } else {
                Ok(rest.to_string())
            }
        };

        let command = match name.to_ascii_lowercase().as_str() {
            "connect" => Command::Connect,
            "balance" => Command::Balance,
            "deposit" => Command::Deposit(required("deposit <amount>")?),
            "withdraw" => Command::Withdraw(required("withdraw <amount>")?),
            "faq" | "faqs" => Command::Faq,
            "select" => Command::Select(rest.to_string()),
            "remove" => Command::Remove(required("remove <number>")?),
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}

/// Asks on the terminal before a wallet shares its accounts.
pub struct TerminalConsent<R> {
    input: SharedInput<R>,
}

impl<R> TerminalConsent<R> {
    pub fn new(input: SharedInput<R>) -> Self {
        Self { input }
    }
}

#[async_trait]
impl<R> ConsentPrompt for TerminalConsent<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    async fn approve(&self, wallet: &str, accounts: &[Address]) -> bool {
        let listed = accounts
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        println!("{wallet} wants to connect {listed} to the ATM. Allow? [y/N]");

        match self.input.lock().await.next_line().await {
            Ok(Some(answer)) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "Failed to read consent answer");
                false
            }
        }
    }
}

/// Run one command and return what to print. Deposits and withdrawals run in
/// the background so the shell stays responsive while they confirm.
pub async fn execute(app: &Arc<AtmApp>, command: Command) -> String {
    match command {
        Command::Connect => match app.connect().await {
            Ok(account) => format!("Connected {account}"),
            Err(e) => e.to_string(),
        },
        Command::Balance => match app.refresh_balance().await {
            Ok(Some(balance)) => format!("Your Balance: {balance} ETH"),
            Ok(None) => AtmError::SessionUnavailable.to_string(),
            Err(e) => e.to_string(),
        },
        Command::Deposit(input) => spawn_transaction(app, TxKind::Deposit, input),
        Command::Withdraw(input) => spawn_transaction(app, TxKind::Withdraw, input),
        Command::Faq => View::from_snapshot(&app.snapshot()).render_faqs(),
        Command::Select(question) => {
            let question = resolve_question(app, &question);
            if question.is_empty() {
                app.select_question("");
                return "Selection cleared.".to_string();
            }
            match app.select_question(&question).as_str() {
                "" => format!("No answer found for '{question}'."),
                answer => format!("{question}\n  {answer}"),
            }
        }
        Command::Remove(position) => match app.remove_faq(&position) {
            Ok(()) => View::from_snapshot(&app.snapshot()).render_faqs(),
            Err(e) => e.to_string(),
        },
        Command::Status => View::from_snapshot(&app.snapshot()).render(),
        Command::Help => HELP.to_string(),
        Command::Quit => String::new(),
    }
}

/// Read commands until `quit` or end of input.
pub async fn run<R>(app: Arc<AtmApp>, input: SharedInput<R>) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin + Send,
{
    println!("{}", View::from_snapshot(&app.snapshot()).render());
    println!("{HELP}");

    loop {
        let line = input.lock().await.next_line().await?;
        let Some(line) = line else {
            debug!("End of input");
            break;
        };

        match Command::parse(&line) {
            Ok(None) => {}
            Ok(Some(Command::Quit)) => break,
            Ok(Some(command)) => println!("{}", execute(&app, command).await),
            Err(e) => println!("{e}"),
        }
    }
    Ok(())
}

/// Accept a question by its list number as well as by its text.
fn resolve_question(app: &AtmApp, input: &str) -> String {
    let snapshot = app.snapshot();
    let faqs = snapshot.faqs();
    match faqs.parse_position(input) {
        Ok(position) if (1..=faqs.len()).contains(&position) => {
            faqs.entries()[position - 1].question.clone()
        }
        _ => input.to_string(),
    }
}

/// Warning for transactions still waiting on confirmation when the shell
/// exits. Their outcome will not be reported.
pub fn pending_notice(snapshot: &AppSnapshot) -> Option<String> {
    let pending = snapshot.in_flight();
    if pending.is_empty() {
        return None;
    }
    let hashes = pending
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    Some(format!(
        "{} transaction(s) still awaiting confirmation, check them in your wallet: {hashes}",
        pending.len()
    ))
}

fn spawn_transaction(app: &Arc<AtmApp>, kind: TxKind, input: String) -> String {
    let app = app.clone();
    let pending = format!("Sending {kind} of {input}...");
    tokio::spawn(async move {
        let result = match kind {
            TxKind::Deposit => app.deposit(&input).await,
            TxKind::Withdraw => app.withdraw(&input).await,
        };
        println!("{}", report(kind, &input, result));
    });
    pending
}

fn report(kind: TxKind, input: &str, result: Result<TxOutcome, AtmError>) -> String {
    match result {
        Ok(TxOutcome::Confirmed { tx_hash, balance }) => {
            let balance = balance.map_or_else(String::new, |b| format!(" Your Balance: {b} ETH"));
            format!("Your {kind} of {} ETH is confirmed ({tx_hash}).{balance}", input.trim())
        }
        Ok(TxOutcome::Skipped) => AtmError::SessionUnavailable.to_string(),
        Err(e) => e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::faq::FaqStore;
    use crate::state::Event;
    use crate::testing::{MockDiscovery, MockWallet};
    use crate::transaction::{Transaction, TransactionSubmitter};
    use crate::wallet::WalletConnector;
    use alloy::primitives::{B256, U256};
    use atm_contract_clients::ANVIL_ATM_CONTRACT_ADDRESS;
    use tokio::io::{AsyncBufReadExt, BufReader};

    fn app(discovery: MockDiscovery) -> Arc<AtmApp> {
        Arc::new(AtmApp::new(
            WalletConnector::new(discovery),
            ANVIL_ATM_CONTRACT_ADDRESS,
            TransactionSubmitter::default(),
            FaqStore::default(),
        ))
    }

    fn input(text: &'static str) -> SharedInput<BufReader<&'static [u8]>> {
        Arc::new(Mutex::new(BufReader::new(text.as_bytes()).lines()))
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("   "), Ok(None));
        assert_eq!(Command::parse("connect"), Ok(Some(Command::Connect)));
        assert_eq!(
            Command::parse("Deposit  30 "),
            Ok(Some(Command::Deposit("30".to_string())))
        );
        assert_eq!(
            Command::parse("select What is the minimum amount to withdraw?"),
            Ok(Some(Command::Select(
                "What is the minimum amount to withdraw?".to_string()
            )))
        );
        assert_eq!(Command::parse("select"), Ok(Some(Command::Select(String::new()))));
        assert_eq!(Command::parse("exit"), Ok(Some(Command::Quit)));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            Command::parse("withdraw"),
            Err(CommandError::MissingArgument("withdraw <amount>"))
        );
        assert_eq!(
            Command::parse("dance now"),
            Err(CommandError::Unknown("dance".to_string()))
        );
    }

    #[tokio::test]
    async fn test_terminal_consent() {
        let consent = TerminalConsent::new(input("yes\nn\n"));
        assert!(consent.approve("mock", &[]).await);
        assert!(!consent.approve("mock", &[]).await);
        // End of input denies
        assert!(!consent.approve("mock", &[]).await);
        assert!(!consent.implicit());
    }

    #[tokio::test]
    async fn test_execute_without_wallet() {
        let app = app(MockDiscovery::empty());

        let out = execute(&app, Command::Connect).await;
        assert_eq!(out, AtmError::ProviderMissing.to_string());

        let out = execute(&app, Command::Balance).await;
        assert_eq!(out, AtmError::SessionUnavailable.to_string());

        let out = execute(&app, Command::Status).await;
        assert!(out.contains("Please install a wallet"));
    }

    #[tokio::test]
    async fn test_execute_connect() {
        let app = app(MockDiscovery::with(Arc::new(MockWallet::approving())));
        let out = execute(&app, Command::Connect).await;
        assert!(out.starts_with("Connected 0x70997970C51812dc3A010C7d01b50e0d17dc79C8"));
    }

    #[tokio::test]
    async fn test_execute_faq_commands() {
        let app = app(MockDiscovery::empty());

        let out = execute(&app, Command::Select("6".to_string())).await;
        assert!(out.ends_with("20 ETH."));

        let out = execute(&app, Command::Select("Is there a fee?".to_string())).await;
        assert_eq!(out, "No answer found for 'Is there a fee?'.");

        let out = execute(&app, Command::Remove("9".to_string())).await;
        assert!(out.starts_with("Please enter a valid question number"));

        execute(&app, Command::Remove("5".to_string())).await;
        assert_eq!(app.snapshot().faqs().len(), 5);

        let out = execute(&app, Command::Select(String::new())).await;
        assert_eq!(out, "Selection cleared.");
        assert!(app.snapshot().selection().is_none());
    }

    #[tokio::test]
    async fn test_run_stops_at_quit() {
        let app = app(MockDiscovery::empty());
        run(app.clone(), input("remove 1\nquit\nremove 1\n"))
            .await
            .unwrap();
        assert_eq!(app.snapshot().faqs().len(), 5);
    }

    #[test]
    fn test_pending_notice_lists_unconfirmed_transactions() {
        assert_eq!(pending_notice(&AppSnapshot::default()), None);

        let hash = B256::repeat_byte(0x11);
        let mut tx = Transaction::new(TxKind::Withdraw, "40");
        tx.validate().unwrap();
        tx.mark_submitted(hash);
        let snapshot = AppSnapshot::default()
            .apply(Event::TransactionSubmitted(tx.clone()))
            .unwrap();

        let notice = pending_notice(&snapshot).unwrap();
        assert!(notice.starts_with("1 transaction(s) still awaiting confirmation"));
        assert!(notice.ends_with(&hash.to_string()));

        tx.mark_confirmed(hash);
        let snapshot = snapshot.apply(Event::TransactionConfirmed(tx)).unwrap();
        assert_eq!(pending_notice(&snapshot), None);
    }

    #[test]
    fn test_report() {
        let hash = B256::repeat_byte(0xab);
        let out = report(
            TxKind::Deposit,
            "30",
            Ok(TxOutcome::Confirmed {
                tx_hash: hash,
                balance: Some(U256::from(55)),
            }),
        );
        assert!(out.starts_with("Your deposit of 30 ETH is confirmed"));
        assert!(out.ends_with("Your Balance: 55 ETH"));

        let out = report(TxKind::Withdraw, "5", Err(AtmError::UserRejected));
        assert_eq!(out, AtmError::UserRejected.to_string());
    }
}
