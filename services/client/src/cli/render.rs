//! services/client/src/cli/render.rs
//!
//! Plain-text rendering of backend payloads for the terminal.

use researchmate_core::domain::{AnalysisResult, AnalyzedDocument, Document, QASession, UserIdentity};
use researchmate_core::workflow::WorkflowState;
use std::io::{self, Write};

pub fn user<W: Write>(out: &mut W, user: &UserIdentity) -> io::Result<()> {
    match &user.full_name {
        Some(name) => writeln!(out, "{} <{}> ({})", user.username, user.email, name)?,
        None => writeln!(out, "{} <{}>", user.username, user.email)?,
    }
    writeln!(out, "  member since {}", user.created_at.format("%Y-%m-%d"))
}

pub fn document_row<W: Write>(out: &mut W, doc: &Document) -> io::Result<()> {
    writeln!(
        out,
        "{:>6}  {:<10}  {:>9}  {}  {}",
        doc.id,
        doc.processing_status,
        human_size(doc.size),
        doc.created_at.format("%Y-%m-%d %H:%M"),
        doc.original_filename.as_deref().unwrap_or(&doc.filename),
    )
}

pub fn document<W: Write>(out: &mut W, doc: &Document) -> io::Result<()> {
    writeln!(out, "Document {}", doc.id)?;
    writeln!(out, "  file:      {}", doc.original_filename.as_deref().unwrap_or(&doc.filename))?;
    writeln!(out, "  size:      {}", human_size(doc.size))?;
    writeln!(out, "  status:    {}", doc.processing_status)?;
    if let Some(pages) = doc.page_count {
        writeln!(out, "  pages:     {}", pages)?;
    }
    if let Some(words) = doc.word_count {
        writeln!(out, "  words:     {}", words)?;
    }
    writeln!(out, "  uploaded:  {}", doc.created_at.format("%Y-%m-%d %H:%M"))?;
    if let Some(processed) = doc.processed_at {
        writeln!(out, "  processed: {}", processed.format("%Y-%m-%d %H:%M"))?;
    }
    Ok(())
}

pub fn analysis<W: Write>(out: &mut W, result: &AnalysisResult) -> io::Result<()> {
    writeln!(out, "Analysis of document {} ({})", result.document_id, result.processing_status)?;
    if let Some(message) = &result.error_message {
        writeln!(out, "  error: {}", message)?;
    }
    if let Some(summary) = &result.summary {
        writeln!(out)?;
        writeln!(out, "Summary")?;
        writeln!(out, "  {}", summary.summary_text)?;
        for bullet in summary.bullet_points.iter().flatten() {
            writeln!(out, "  - {}", bullet)?;
        }
    }
    if !result.keywords.is_empty() {
        let keywords: Vec<&str> = result.keywords.iter().map(|k| k.keyword.as_str()).collect();
        writeln!(out)?;
        writeln!(out, "Keywords: {}", keywords.join(", "))?;
    }
    Ok(())
}

pub fn analyzed<W: Write>(out: &mut W, analyzed: &AnalyzedDocument, cause: Option<&str>) -> io::Result<()> {
    if analyzed.is_synthetic() {
        writeln!(out, "The backend could not analyze the document; showing a demo result instead.")?;
        if let Some(cause) = cause {
            writeln!(out, "  cause: {}", cause)?;
        }
    }
    analysis(out, &analyzed.result)
}

pub fn sessions<W: Write>(out: &mut W, sessions: &[QASession]) -> io::Result<()> {
    if sessions.is_empty() {
        return writeln!(out, "No stored questions.");
    }
    for session in sessions {
        writeln!(
            out,
            "[{}] document {} at {}",
            session.id,
            session.document_id,
            session.created_at.format("%Y-%m-%d %H:%M")
        )?;
        writeln!(out, "  Q: {}", session.question)?;
        writeln!(out, "  A: {}", session.answer)?;
    }
    Ok(())
}

pub fn workflow_state(state: WorkflowState) -> &'static str {
    match state {
        WorkflowState::Idle => "Idle",
        WorkflowState::Uploading => "Uploading...",
        WorkflowState::Uploaded => "Uploaded.",
        WorkflowState::Analyzing => "Analyzing...",
        WorkflowState::Completed => "Done.",
        WorkflowState::Failed => "Failed.",
    }
}

fn human_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let bytes_f = bytes as f64;
    if bytes_f < KIB {
        format!("{} B", bytes)
    } else if bytes_f < KIB * KIB {
        format!("{:.1} KB", bytes_f / KIB)
    } else {
        format!("{:.1} MB", bytes_f / (KIB * KIB))
    }
}
