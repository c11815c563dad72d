//! Plain-text exercise import.
//!
//! File layout, one exercise per section, sections separated by a `---` line:
//!
//! ```text
//! Title
//! Optional description
//! Content line 1
//! Content line 2
//! ---
//! Next title
//! ...
//! ```

use std::path::Path;

use crate::domain::NewExercise;
use crate::error::AppError;

const UPLOADED_TAG: &str = "uploaded";

fn file_stem(filename: &str) -> &str {
  Path::new(filename).file_stem().and_then(|s| s.to_str()).unwrap_or(filename)
}

fn is_supported(filename: &str) -> bool {
  let lower = filename.to_lowercase();
  lower.ends_with(".txt") || lower.ends_with(".md")
}

fn split_sections(content: &str) -> Vec<String> {
  let mut sections = Vec::new();
  let mut current: Vec<&str> = Vec::new();
  for line in content.lines() {
    if line.trim() == "---" {
      sections.push(current.join("\n"));
      current.clear();
    } else {
      current.push(line);
    }
  }
  sections.push(current.join("\n"));
  sections.into_iter().filter(|s| !s.trim().is_empty()).collect()
}

/// Parse `content` into exercises. Fails on unsupported extensions and on files with nothing usable.
pub fn parse_exercises(filename: &str, content: &str) -> Result<Vec<NewExercise>, AppError> {
  if !is_supported(filename) {
    return Err(AppError::invalid("Only text files (.txt, .md) are supported"));
  }
  let stem = file_stem(filename);
  let mut out = Vec::new();

  for (index, section) in split_sections(content).iter().enumerate() {
    let lines: Vec<&str> = section.trim().lines().collect();
    if lines.len() < 2 {
      continue;
    }
    let title = match lines[0].trim() {
      "" => format!("{stem} - Exercise {}", index + 1),
      t => t.to_string(),
    };
    let description = (lines.len() > 2 && !lines[1].trim().is_empty() && lines[1].trim() != lines[2].trim())
      .then(|| lines[1].trim().to_string());
    let body_start = if description.is_some() { 2 } else { 1 };
    let body = lines[body_start..].join("\n").trim().to_string();
    if body.is_empty() {
      continue;
    }
    out.push(NewExercise {
      title,
      content: body,
      description,
      tags: vec![UPLOADED_TAG.to_string(), stem.to_string()],
    });
  }

  if out.is_empty() && !content.trim().is_empty() {
    out.push(NewExercise {
      title: stem.to_string(),
      content: content.trim().to_string(),
      description: None,
      tags: vec![UPLOADED_TAG.to_string()],
    });
  }

  if out.is_empty() {
    return Err(AppError::invalid("No valid exercises found in the uploaded file"));
  }
  Ok(out)
}
