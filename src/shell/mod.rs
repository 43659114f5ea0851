//! Interactive shell over an integer-keyed B+ tree
//!
//! The shell only goes through the tree's public operations. Command
//! parsing and execution are plain functions so they can be tested without
//! a terminal; `run` wires them to a rustyline editor.

mod command;
mod error;

pub use command::{Command, HELP};
pub use error::{ParseError, ShellError, ShellResult};

use log::info;
use prettytable::{Table, row};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::btree::{BPlusTree, Entry};

const PROMPT: &str = "bptree> ";

/// Result of executing one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Output(String),
    Exit,
}

/// Shell state: the tree being edited
pub struct Shell {
    tree: BPlusTree<i64, String>,
}

impl Shell {
    /// Create a shell over an empty tree of the given order
    pub fn new(order: usize) -> ShellResult<Self> {
        Ok(Self {
            tree: BPlusTree::new(order)?,
        })
    }

    pub fn tree(&self) -> &BPlusTree<i64, String> {
        &self.tree
    }

    /// Parse and execute one input line, `None` for a blank line
    pub fn run_line(&mut self, line: &str) -> ShellResult<Option<Outcome>> {
        match Command::parse(line)? {
            Some(command) => self.execute(command).map(Some),
            None => Ok(None),
        }
    }

    /// Execute a parsed command
    pub fn execute(&mut self, command: Command) -> ShellResult<Outcome> {
        let output = match command {
            Command::Insert { key, value } => {
                let message = format!("Inserted key {key} with value '{value}'");
                self.tree.insert(key, value)?;
                message
            }
            Command::Delete { key } => {
                let value = self.tree.delete(&key)?;
                format!("Deleted key {key} (value '{value}')")
            }
            Command::Search { key } => match self.tree.search(&key) {
                Some(value) => format!("Key {key} found with value '{value}'"),
                None => format!("Key {key} not found"),
            },
            Command::Range { low, high } => render_entries(self.tree.range(&low, &high)),
            Command::Show => render_levels(&self.tree),
            Command::List => render_entries(self.tree.iter()),
            Command::Stats => render_stats(&self.tree),
            Command::Check => {
                self.tree.validate()?;
                "Tree is valid".to_string()
            }
            Command::Help => HELP.to_string(),
            Command::Exit => return Ok(Outcome::Exit),
        };

        Ok(Outcome::Output(output))
    }
}

/// Render entries as a two-column table
fn render_entries<'a>(entries: impl Iterator<Item = &'a Entry<i64, String>>) -> String {
    let mut table = Table::new();
    table.set_titles(row!["Key", "Value"]);

    let mut count = 0;
    for entry in entries {
        table.add_row(row![entry.key(), entry.value()]);
        count += 1;
    }

    if count == 0 {
        return "(no entries)".to_string();
    }
    format!("{table}{count} entries")
}

/// Render the tree level by level, one line per depth
fn render_levels(tree: &BPlusTree<i64, String>) -> String {
    tree.keys_by_level()
        .iter()
        .enumerate()
        .map(|(depth, level)| {
            let kind = match level.first() {
                Some(node) if node.is_leaf => "Leaf",
                _ => "Internal",
            };
            let nodes: Vec<String> = level.iter().map(|n| format!("{:?}", n.keys)).collect();
            format!("{depth} {kind}: {}", nodes.join(" "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_stats(tree: &BPlusTree<i64, String>) -> String {
    let mut table = Table::new();
    table.add_row(row!["Order", tree.order()]);
    table.add_row(row!["Entries", tree.len()]);
    table.add_row(row!["Height", tree.height()]);
    table.add_row(row!["Nodes", tree.node_count()]);
    table.add_row(row!["Keys per node", format!("{}..={}", tree.min_keys(), tree.max_keys())]);
    table.to_string()
}

/// Run the read-eval-print loop until `exit`, EOF or Ctrl-C
///
/// Command errors are printed and the loop continues.
pub fn run(order: usize) -> ShellResult<()> {
    let mut shell = Shell::new(order)?;
    let mut editor = DefaultEditor::new()?;

    info!("starting shell with order {}", order);
    println!("B+ tree of order {order}. Type 'help' for commands.");

    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                editor.add_history_entry(line.as_str())?;

                match shell.run_line(&line) {
                    Ok(Some(Outcome::Output(text))) => println!("{text}"),
                    Ok(Some(Outcome::Exit)) => break,
                    Ok(None) => {}
                    Err(e) => println!("Error: {e}"),
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    println!("Exiting...");
    Ok(())
}
