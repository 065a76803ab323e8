//! services/client/src/cli/commands.rs
//!
//! Executes one parsed command against the application state. Every invocation resolves
//! the stored session first; commands other than the public ones need it to be valid.

use super::{render, Command};
use crate::adapters::load_upload_file;
use crate::error::CliError;
use crate::state::AppState;
use researchmate_core::auth::auth_error_message;
use researchmate_core::conversation::FALLBACK_ANSWER;
use researchmate_core::domain::DocumentId;
use researchmate_core::error::ClientError;
use researchmate_core::workflow::WorkflowState;
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::info;

pub async fn run<R, W>(state: &AppState, command: Command, input: &mut R, out: &mut W) -> Result<(), CliError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    state.auth.bootstrap().await;
    if !command.is_public() && !state.auth.is_authenticated() {
        return Err(CliError::NotSignedIn);
    }

    match command {
        Command::Login { username, password } => {
            let password = match password {
                Some(password) => password,
                None => prompt(input, out, "Password: ").await?,
            };
            let user = state
                .auth
                .login(&username, &password)
                .await
                .map_err(|e| CliError::Auth(auth_error_message(&e)))?;
            writeln!(out, "Signed in as {}.", user.username)?;
        }
        Command::Register {
            email,
            username,
            full_name,
            password,
        } => {
            let password = match password {
                Some(password) => password,
                None => prompt(input, out, "Password: ").await?,
            };
            let user = state
                .auth
                .register(&email, &username, &password, full_name.as_deref())
                .await
                .map_err(|e| CliError::Auth(auth_error_message(&e)))?;
            writeln!(out, "Account created. Signed in as {}.", user.username)?;
        }
        Command::Logout => {
            state.auth.logout();
            writeln!(out, "Signed out.")?;
        }
        Command::Whoami => match state.auth.user() {
            Some(user) if state.auth.is_authenticated() => render::user(out, &user)?,
            _ => writeln!(out, "Not signed in.")?,
        },
        Command::Health => {
            let health = state.client.health_check().await?;
            writeln!(out, "{} {} is {}", health.service, health.version, health.status)?;
        }
        Command::Documents => {
            let documents = state.workflow.list_documents().await?;
            if documents.is_empty() {
                writeln!(out, "No documents uploaded yet.")?;
            }
            for doc in &documents {
                render::document_row(out, doc)?;
            }
        }
        Command::Show { document_id } => {
            let doc = state.workflow.document(document_id).await?;
            render::document(out, &doc)?;
        }
        Command::Analysis { document_id } => {
            let result = state.workflow.analysis(document_id).await?;
            render::analysis(out, &result)?;
        }
        Command::Delete { document_id } => {
            let ack = state.workflow.delete_document(document_id).await?;
            writeln!(out, "{}", ack.message)?;
        }
        Command::Analyze { path, chat } => {
            let document_id = analyze(state, &path, out).await?;
            if chat {
                converse(state, document_id, input, out).await?;
            }
        }
        Command::Chat { document_id } => converse(state, document_id, input, out).await?,
        Command::History { document_id } => {
            state.conversation.set_active_document(Some(document_id));
            let sessions = state.conversation.backend_history().await?;
            render::sessions(out, &sessions)?;
        }
        Command::UserHistory { skip, limit } => {
            let sessions = state.client.get_user_qa_history(skip, limit).await?;
            render::sessions(out, &sessions)?;
        }
        Command::DeleteQa { session_id } => {
            let ack = state.conversation.delete_backend_session(session_id).await?;
            writeln!(out, "{}", ack.message)?;
        }
    }
    Ok(())
}

/// Uploads and analyzes the PDF at `path`, reporting each workflow step as it happens.
async fn analyze<W: Write>(state: &AppState, path: &Path, out: &mut W) -> Result<DocumentId, CliError> {
    let file = load_upload_file(path).await?;
    let mut updates = state.workflow.subscribe();
    let mut shown = WorkflowState::Idle;

    let upload = state.workflow.upload(file);
    tokio::pin!(upload);
    let analyzed = loop {
        tokio::select! {
            result = &mut upload => break result?,
            changed = updates.changed() => {
                if changed.is_err() {
                    break (&mut upload).await?;
                }
                let current = updates.borrow_and_update().state;
                if current != shown && current != WorkflowState::Completed {
                    writeln!(out, "{}", render::workflow_state(current))?;
                    shown = current;
                }
            }
        }
    };

    let snapshot = state.workflow.snapshot();
    render::analyzed(out, &analyzed, snapshot.last_error.as_deref())?;
    state.conversation.set_active_document(Some(analyzed.document_id));
    info!(document_id = analyzed.document_id, "Analysis ready.");
    Ok(analyzed.document_id)
}

/// Interactive question loop. `/clear` empties the thread, `/quit` or end of input leaves.
async fn converse<R, W>(state: &AppState, document_id: DocumentId, input: &mut R, out: &mut W) -> Result<(), CliError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    state.conversation.set_active_document(Some(document_id));
    writeln!(out, "Ask about document {}. Type /clear to start over, /quit to leave.", document_id)?;

    loop {
        write!(out, "> ")?;
        out.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line).await? == 0 {
            break;
        }
        let question = line.trim();
        match question {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                state.conversation.clear();
                writeln!(out, "Conversation cleared.")?;
                continue;
            }
            _ => {}
        }

        match state.conversation.ask(question).await {
            Ok(response) => writeln!(out, "{}", response.answer)?,
            Err(ClientError::AuthExpired) => return Err(ClientError::AuthExpired.into()),
            Err(_) => writeln!(out, "{}", FALLBACK_ANSWER)?,
        }
    }
    Ok(())
}

async fn prompt<R, W>(input: &mut R, out: &mut W, label: &str) -> Result<String, CliError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    write!(out, "{}", label)?;
    out.flush()?;
    let mut line = String::new();
    input.read_line(&mut line).await?;
    Ok(line.trim_end_matches(&['\r', '\n'][..]).to_string())
}
