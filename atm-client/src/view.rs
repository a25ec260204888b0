//! Terminal rendering of an [`AppSnapshot`].

use alloy::primitives::{Address, U256};
use term_table::row::Row;
use term_table::table_cell::{Alignment as CellAlignment, TableCell};
use term_table::{Table, TableStyle};

use crate::config::consts::{MIN_DEPOSIT, MIN_WITHDRAW};
use crate::faq::FaqSelection;
use crate::state::AppSnapshot;
use crate::transaction::{Transaction, TxState};

pub const TITLE: &str = "Welcome to the Metacrafters ATM!";

/// What the wallet area of the page shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletPanel {
    /// No provider in the environment.
    InstallPrompt,
    /// Provider found, no account connected yet.
    ConnectPrompt,
    Connected {
        account: Address,
        balance: Option<U256>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub wallet: WalletPanel,
    pub faqs: Vec<String>,
    pub selection: Option<FaqSelection>,
    pub last_transaction: Option<String>,
    pub pending: usize,
}

impl View {
    pub fn from_snapshot(snapshot: &AppSnapshot) -> Self {
        let wallet = match (snapshot.has_provider(), snapshot.account()) {
            (false, _) => WalletPanel::InstallPrompt,
            (true, None) => WalletPanel::ConnectPrompt,
            (true, Some(account)) => WalletPanel::Connected {
                account,
                balance: snapshot.balance(),
            },
        };

        Self {
            wallet,
            faqs: snapshot
                .faqs()
                .entries()
                .iter()
                .map(|faq| faq.question.clone())
                .collect(),
            selection: snapshot.selection().cloned(),
            last_transaction: snapshot.last_transaction().map(describe),
            pending: snapshot.in_flight().len(),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.render_wallet());
        out.push('\n');
        out.push_str(&self.render_faqs());
        out
    }

    pub fn render_wallet(&self) -> String {
        let mut table = Table::new();
        table.style = TableStyle::extended();

        table.add_row(Row::new(vec![TableCell::builder(TITLE)
            .col_span(2)
            .alignment(CellAlignment::Center)
            .build()]));

        match &self.wallet {
            WalletPanel::InstallPrompt => {
                table.add_row(Row::new(vec![TableCell::builder(
                    "Please install a wallet in order to use this ATM.",
                )
                .col_span(2)
                .alignment(CellAlignment::Center)
                .build()]));
            }
            WalletPanel::ConnectPrompt => {
                table.add_row(Row::new(vec![TableCell::builder(
                    "Please connect your wallet (type 'connect')",
                )
                .col_span(2)
                .alignment(CellAlignment::Center)
                .build()]));
            }
            WalletPanel::Connected { account, balance } => {
                let balance = balance.map_or_else(|| "…".to_string(), |b| format!("{b} ETH"));
                table.add_row(label_row("Your Account", account.to_string()));
                table.add_row(label_row("Your Balance", balance));
                table.add_row(label_row(
                    "Actions",
                    format!("deposit <n> (min {MIN_DEPOSIT}), withdraw <n> (min {MIN_WITHDRAW})"),
                ));
                if let Some(last) = &self.last_transaction {
                    table.add_row(label_row("Last Transaction", last.clone()));
                }
                if self.pending > 0 {
                    table.add_row(label_row("Pending", self.pending.to_string()));
                }
            }
        }

        table.render()
    }

    pub fn render_faqs(&self) -> String {
        let mut table = Table::new();
        table.style = TableStyle::extended();

        table.add_row(Row::new(vec![TableCell::builder("Frequently Asked Questions")
            .col_span(2)
            .alignment(CellAlignment::Center)
            .build()]));

        if self.faqs.is_empty() {
            table.add_row(Row::new(vec![TableCell::builder("No questions left.")
                .col_span(2)
                .alignment(CellAlignment::Center)
                .build()]));
        }
        for (i, question) in self.faqs.iter().enumerate() {
            table.add_row(label_row(&(i + 1).to_string(), question.clone()));
        }

        if let Some(selection) = &self.selection {
            table.add_row(label_row("Selected", selection.question.clone()));
            table.add_row(label_row("Answer", selection.answer.clone()));
        }

        table.render()
    }
}

fn label_row(label: &str, value: String) -> Row {
    Row::new(vec![
        TableCell::builder(label)
            .alignment(CellAlignment::Right)
            .build(),
        TableCell::builder(value)
            .alignment(CellAlignment::Left)
            .build(),
    ])
}

fn describe(tx: &Transaction) -> String {
    let amount = tx.input().trim();
    match tx.state() {
        TxState::Idle | TxState::Validated => format!("{} of {amount} pending", tx.kind()),
        TxState::Submitted(hash) => format!("{} of {amount} submitted ({hash})", tx.kind()),
        TxState::Confirmed(_) => format!("{} of {amount} ETH confirmed", tx.kind()),
        TxState::Rejected(rejection) => rejection.to_string(),
        TxState::Failed(reason) => format!("{} failed: {reason}", tx.kind()),
    }
}
