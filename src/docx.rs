// src/docx.rs
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use docx_rs::{
    AbstractNumbering, AlignmentType, Docx, IndentLevel, Level, LevelJc, LevelText, NumberFormat,
    Numbering, NumberingId, PageMargin, Paragraph, Run, RunFonts, Start, Table, TableCell,
    TableRow,
};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

/* -------------------------------------------------------------------------- */
/* Line classification                                                        */
/* -------------------------------------------------------------------------- */

/// One recognized Markdown construct. Classification is best-effort: the
/// converter transcribes what it can recognize and never validates input.
#[derive(Debug, Clone, PartialEq)]
pub enum DocElement {
    Heading { level: u8, text: String },
    HorizontalRule,
    /// Buffered rows; the first is rendered as a bolded header.
    Table { rows: Vec<Vec<String>> },
    Bullet(String),
    Numbered(String),
    Figure { path: String },
    CodeLine(String),
    BlockMath(String),
    Paragraph(String),
}

static BOLD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*").unwrap());
static LINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").unwrap());
static IMAGE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[([^\]]+)\]\(([^)]+)\)").unwrap());
static NUMBERED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\. ").unwrap());
static INLINE_MATH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$([^$]+)\$").unwrap());

fn strip_bold(text: &str) -> String {
    BOLD_RE.replace_all(text, "$1").to_string()
}

fn strip_links(text: &str) -> String {
    LINK_RE.replace_all(text, "$1").to_string()
}

/// A table separator row holds nothing but dashes and whitespace.
fn is_separator_row(cells: &[String]) -> bool {
    cells
        .iter()
        .all(|c| c.chars().all(|ch| ch == '-' || ch.is_whitespace()))
}

fn table_cells(line: &str) -> Vec<String> {
    let parts: Vec<&str> = line.split('|').collect();
    if parts.len() < 3 {
        return Vec::new();
    }
    parts[1..parts.len() - 1]
        .iter()
        .map(|c| c.trim().to_string())
        .collect()
}

/// Walk the document line by line and classify each into elements. Table
/// rows buffer until a non-table line (or the end of input) and emit as one
/// element.
pub fn classify_lines(lines: &[&str]) -> Vec<DocElement> {
    let mut out = Vec::new();
    let mut in_code_block = false;
    let mut table_buffer: Vec<Vec<String>> = Vec::new();
    let mut i = 0;

    let flush_table = |buffer: &mut Vec<Vec<String>>, out: &mut Vec<DocElement>| {
        if !buffer.is_empty() {
            out.push(DocElement::Table { rows: std::mem::take(buffer) });
        }
    };

    while i < lines.len() {
        let line = lines[i].trim_end();

        if line.trim().is_empty() {
            flush_table(&mut table_buffer, &mut out);
            i += 1;
            continue;
        }

        if line.starts_with("```") {
            flush_table(&mut table_buffer, &mut out);
            in_code_block = !in_code_block;
            i += 1;
            continue;
        }
        if in_code_block {
            out.push(DocElement::CodeLine(line.to_string()));
            i += 1;
            continue;
        }

        let is_table_line = line.contains('|') && !line.starts_with('!');
        if !is_table_line {
            flush_table(&mut table_buffer, &mut out);
        }

        if let Some(text) = line.strip_prefix("# ") {
            out.push(DocElement::Heading { level: 1, text: strip_bold(text) });
        } else if let Some(text) = line.strip_prefix("## ") {
            out.push(DocElement::Heading { level: 2, text: strip_bold(text) });
        } else if let Some(text) = line.strip_prefix("### ") {
            out.push(DocElement::Heading { level: 3, text: strip_bold(text) });
        } else if let Some(text) = line.strip_prefix("#### ") {
            out.push(DocElement::Heading { level: 4, text: strip_bold(text) });
        } else if line.starts_with("---") {
            out.push(DocElement::HorizontalRule);
        } else if is_table_line {
            let cells = table_cells(line);
            if !cells.is_empty() && !is_separator_row(&cells) {
                table_buffer.push(cells.iter().map(|c| strip_bold(c)).collect());
            }
        } else if let Some(text) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
            out.push(DocElement::Bullet(strip_bold(text)));
        } else if NUMBERED_RE.is_match(line) {
            let text = NUMBERED_RE.replace(line, "").to_string();
            out.push(DocElement::Numbered(strip_bold(&text)));
        } else if line.starts_with("![") {
            if let Some(caps) = IMAGE_RE.captures(line) {
                out.push(DocElement::Figure { path: caps[2].to_string() });
            }
        } else if let Some(first) = line.strip_prefix("$$") {
            // consume until the closing $$ (or the end of input, best-effort)
            let mut equation = vec![first.to_string()];
            i += 1;
            while i < lines.len() && !lines[i].trim().starts_with("$$") {
                equation.push(lines[i].trim_end().to_string());
                i += 1;
            }
            out.push(DocElement::BlockMath(equation.join("\n").trim().to_string()));
        } else if line.contains('$') {
            let text = INLINE_MATH_RE.replace_all(line, "[$1]").to_string();
            out.push(DocElement::Paragraph(strip_bold(&text)));
        } else {
            let text = strip_links(&strip_bold(line));
            if !text.trim().is_empty() {
                out.push(DocElement::Paragraph(text));
            }
        }

        i += 1;
    }

    flush_table(&mut table_buffer, &mut out);
    out
}

/* -------------------------------------------------------------------------- */
/* Document emission                                                          */
/* -------------------------------------------------------------------------- */

const BULLET_NUMBERING: usize = 1;
const DECIMAL_NUMBERING: usize = 2;

fn heading_size(level: u8) -> usize {
    // half-points
    match level {
        1 => 36,
        2 => 30,
        3 => 26,
        _ => 24,
    }
}

fn plain_paragraph(text: &str) -> Paragraph {
    Paragraph::new().add_run(Run::new().add_text(text))
}

fn element_to_docx(docx: Docx, element: &DocElement) -> Docx {
    match element {
        DocElement::Heading { level, text } => {
            let mut p = Paragraph::new()
                .add_run(Run::new().add_text(text.as_str()).bold().size(heading_size(*level)));
            if *level == 1 {
                p = p.align(AlignmentType::Center);
            }
            docx.add_paragraph(p)
        }
        DocElement::HorizontalRule => docx.add_paragraph(plain_paragraph(&"_".repeat(100))),
        DocElement::Table { rows } => {
            let n_cols = rows.iter().map(Vec::len).max().unwrap_or(0);
            let table_rows: Vec<TableRow> = rows
                .iter()
                .enumerate()
                .map(|(row_idx, row)| {
                    let cells: Vec<TableCell> = (0..n_cols)
                        .map(|col| {
                            let text = row.get(col).map(String::as_str).unwrap_or("");
                            let mut run = Run::new().add_text(text);
                            if row_idx == 0 {
                                run = run.bold();
                            }
                            TableCell::new().add_paragraph(Paragraph::new().add_run(run))
                        })
                        .collect();
                    TableRow::new(cells)
                })
                .collect();
            // spacing after the table, as a reader expects
            docx.add_table(Table::new(table_rows)).add_paragraph(Paragraph::new())
        }
        DocElement::Bullet(text) => docx.add_paragraph(
            Paragraph::new()
                .add_run(Run::new().add_text(text.as_str()))
                .numbering(NumberingId::new(BULLET_NUMBERING), IndentLevel::new(0)),
        ),
        DocElement::Numbered(text) => docx.add_paragraph(
            Paragraph::new()
                .add_run(Run::new().add_text(text.as_str()))
                .numbering(NumberingId::new(DECIMAL_NUMBERING), IndentLevel::new(0)),
        ),
        DocElement::Figure { path } => docx.add_paragraph(
            Paragraph::new().add_run(
                Run::new()
                    .add_text(format!("[Figure: {}]", path))
                    .italic()
                    .color("808080"),
            ),
        ),
        DocElement::CodeLine(text) => docx.add_paragraph(
            Paragraph::new().add_run(
                Run::new()
                    .add_text(text.as_str())
                    .fonts(RunFonts::new().ascii("Courier New"))
                    .size(18),
            ),
        ),
        DocElement::BlockMath(text) => docx.add_paragraph(
            Paragraph::new()
                .add_run(
                    Run::new()
                        .add_text(text.as_str())
                        .fonts(RunFonts::new().ascii("Cambria Math"))
                        .size(20),
                )
                .align(AlignmentType::Center),
        ),
        DocElement::Paragraph(text) => docx.add_paragraph(plain_paragraph(text)),
    }
}

pub fn write_docx(elements: &[DocElement], out: &Path) -> Result<()> {
    let mut docx = Docx::new()
        .page_margin(PageMargin::new().top(1440).bottom(1440).left(1440).right(1440))
        .add_abstract_numbering(
            AbstractNumbering::new(BULLET_NUMBERING).add_level(Level::new(
                0,
                Start::new(1),
                NumberFormat::new("bullet"),
                LevelText::new("•"),
                LevelJc::new("left"),
            )),
        )
        .add_numbering(Numbering::new(BULLET_NUMBERING, BULLET_NUMBERING))
        .add_abstract_numbering(
            AbstractNumbering::new(DECIMAL_NUMBERING).add_level(Level::new(
                0,
                Start::new(1),
                NumberFormat::new("decimal"),
                LevelText::new("%1."),
                LevelJc::new("left"),
            )),
        )
        .add_numbering(Numbering::new(DECIMAL_NUMBERING, DECIMAL_NUMBERING));

    for element in elements {
        docx = element_to_docx(docx, element);
    }

    let file = std::fs::File::create(out)
        .with_context(|| format!("create {}", out.display()))?;
    docx.build()
        .pack(file)
        .map_err(|e| anyhow!("packing {}: {}", out.display(), e))?;
    Ok(())
}

/// Transcribe a Markdown file into a formatted Word document.
pub fn run(input: &Path, output: &Path) -> Result<()> {
    info!("Converting Markdown to Word document - input={}", input.display());
    let raw = std::fs::read_to_string(input)
        .with_context(|| format!("read {}", input.display()))?;
    let lines: Vec<&str> = raw.lines().collect();

    let elements = classify_lines(&lines);
    write_docx(&elements, output)?;

    info!("Converted - elements={}, output={}", elements.len(), output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(doc: &str) -> Vec<DocElement> {
        classify_lines(&doc.lines().collect::<Vec<_>>())
    }

    #[test]
    fn headings_rules_and_paragraphs() {
        let els = classify("# Title\n\n## **Section**\n---\nBody with [a link](http://x) here.\n");
        assert_eq!(els[0], DocElement::Heading { level: 1, text: "Title".into() });
        assert_eq!(els[1], DocElement::Heading { level: 2, text: "Section".into() });
        assert_eq!(els[2], DocElement::HorizontalRule);
        assert_eq!(els[3], DocElement::Paragraph("Body with a link here.".into()));
    }

    #[test]
    fn table_rows_buffer_into_one_element_skipping_separators() {
        let els = classify(
            "| **Metric** | Value |\n|---|---|\n| Accuracy | 0.89 |\n| Recall | 0.91 |\nAfter table\n",
        );
        assert_eq!(
            els[0],
            DocElement::Table {
                rows: vec![
                    vec!["Metric".to_string(), "Value".to_string()],
                    vec!["Accuracy".to_string(), "0.89".to_string()],
                    vec!["Recall".to_string(), "0.91".to_string()],
                ]
            }
        );
        assert_eq!(els[1], DocElement::Paragraph("After table".into()));
    }

    #[test]
    fn table_at_end_of_input_still_emits() {
        let els = classify("| a | b |\n| 1 | 2 |");
        assert_eq!(els.len(), 1);
        assert!(matches!(&els[0], DocElement::Table { rows } if rows.len() == 2));
    }

    #[test]
    fn lists_strip_bold_markers() {
        let els = classify("- **bold** bullet\n* star bullet\n3. third item\n");
        assert_eq!(els[0], DocElement::Bullet("bold bullet".into()));
        assert_eq!(els[1], DocElement::Bullet("star bullet".into()));
        assert_eq!(els[2], DocElement::Numbered("third item".into()));
    }

    #[test]
    fn code_blocks_capture_lines_verbatim() {
        let els = classify("```\nlet x = 1;\nprintln!(\"{}\", x);\n```\nafter\n");
        assert_eq!(els[0], DocElement::CodeLine("let x = 1;".into()));
        assert_eq!(els[1], DocElement::CodeLine("println!(\"{}\", x);".into()));
        assert_eq!(els[2], DocElement::Paragraph("after".into()));
    }

    #[test]
    fn figures_keep_the_path_only() {
        let els = classify("![sentiment gauge](figures/gauge.png)\n");
        assert_eq!(els[0], DocElement::Figure { path: "figures/gauge.png".into() });
    }

    #[test]
    fn math_block_and_inline() {
        let els = classify("$$\nE = mc^2\n$$\nScore is $x+1$ here\n");
        assert_eq!(els[0], DocElement::BlockMath("E = mc^2".into()));
        assert_eq!(els[1], DocElement::Paragraph("Score is [x+1] here".into()));
    }

    #[test]
    fn unterminated_code_block_is_best_effort() {
        let els = classify("```\norphan line\n");
        assert_eq!(els, vec![DocElement::CodeLine("orphan line".into())]);
    }

    #[test]
    fn writes_a_docx_file(){
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("report.docx");
        let els = classify("# VoC Report\n\n| k | v |\n| a | 1 |\n\n- one\n");
        write_docx(&els, &out).unwrap();
        let meta = std::fs::metadata(&out).unwrap();
        assert!(meta.len() > 0);
    }
}
