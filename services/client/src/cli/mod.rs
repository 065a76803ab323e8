//! services/client/src/cli/mod.rs
//!
//! Command-line surface of the client.

pub mod commands;
pub mod render;

use clap::{Parser, Subcommand};
use researchmate_core::domain::{DocumentId, QaSessionId};
use researchmate_core::gateway::DEFAULT_HISTORY_LIMIT;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "researchmate")]
#[command(about = "Upload academic PDFs, read their analysis, and ask questions about them")]
#[command(version)]
pub struct Cli {
    /// Backend base URL (overrides RESEARCHMATE_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Sign in and remember the session
    Login {
        username: String,
        /// Read from standard input when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account, then sign in with it
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        full_name: Option<String>,
        /// Read from standard input when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Check that the backend is up
    Health,
    /// List uploaded documents
    Documents,
    /// Show one document's metadata
    Show { document_id: DocumentId },
    /// Show the stored analysis of a document
    Analysis { document_id: DocumentId },
    /// Delete a document
    Delete { document_id: DocumentId },
    /// Upload a PDF and analyze it
    Analyze {
        path: PathBuf,
        /// Start a chat about the document afterwards
        #[arg(long)]
        chat: bool,
    },
    /// Ask questions about an analyzed document
    Chat { document_id: DocumentId },
    /// Stored questions and answers for a document
    History { document_id: DocumentId },
    /// Stored questions and answers across all documents
    UserHistory {
        #[arg(long, default_value_t = 0)]
        skip: u32,
        #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
        limit: u32,
    },
    /// Delete one stored question/answer
    DeleteQa { session_id: QaSessionId },
}

impl Command {
    /// Whether the command can run without a signed-in session.
    pub fn is_public(&self) -> bool {
        matches!(
            self,
            Command::Login { .. }
                | Command::Register { .. }
                | Command::Logout
                | Command::Whoami
                | Command::Health
        )
    }
}
