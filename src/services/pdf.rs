// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! PDF export of generated study materials.
//!
//! Layout is A4 in millimetres. Positions are tracked from the top edge
//! and flipped to PDF coordinates when drawing. Builtin Helvetica is used
//! so no font files ship with the binary; text widths are estimated from
//! the average glyph width.

use crate::error::AppError;
use crate::models::study::Mcq;
use crate::models::{ContentType, GeneratedContent};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerIndex, PdfLayerReference, PdfPageIndex, Point, Rgb,
};

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN: f32 = 20.0;
const CONTENT_W: f32 = PAGE_W - 2.0 * MARGIN;
const BODY_START: f32 = 58.0;
const CONTINUED_TOP: f32 = 20.0;
/// Lowest baseline for body content; the footer sits below it.
const BODY_BOTTOM: f32 = PAGE_H - 20.0;
const PT_TO_MM: f32 = 0.3528;

const APP_HEADER: &str = "Universal Study Material Generator";

type Rgb8 = (u8, u8, u8);
const BLACK: Rgb8 = (0, 0, 0);
const ACCENT: Rgb8 = (98, 70, 234);
const GREY: Rgb8 = (100, 100, 100);
const LIGHT_GREY: Rgb8 = (150, 150, 150);
const WATERMARK_GREY: Rgb8 = (180, 180, 180);
const RULE_GREY: Rgb8 = (200, 200, 200);
const GREEN: Rgb8 = (0, 128, 0);
const RED: Rgb8 = (200, 0, 0);

/// What to export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportSection {
    Section(ContentType),
    All,
}

impl ExportSection {
    /// Parse a content type identifier or `all`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "all" => Some(ExportSection::All),
            other => ContentType::from_id(other).map(ExportSection::Section),
        }
    }

    pub fn default_filename(self) -> &'static str {
        match self {
            ExportSection::All => "complete-study-materials.pdf",
            ExportSection::Section(ContentType::Summary) => "study-summary.pdf",
            ExportSection::Section(ContentType::Flashcards) => "flashcards.pdf",
            ExportSection::Section(ContentType::Mcqs) => "mcqs.pdf",
            ExportSection::Section(ContentType::TrueFalse) => "true-false.pdf",
            ExportSection::Section(ContentType::Definitions) => "definitions.pdf",
            ExportSection::Section(
                ContentType::KidsExplanation | ContentType::ProfessionalExplanation,
            ) => "explanation.pdf",
        }
    }

    pub fn default_title(self) -> &'static str {
        match self {
            ExportSection::All => "Complete Study Materials",
            ExportSection::Section(t) => t.title(),
        }
    }
}

/// Document header fields.
#[derive(Debug, Clone)]
pub struct PdfOptions {
    pub title: String,
    /// Shown as "Difficulty Level: X"
    pub difficulty: Option<String>,
    /// Real name of the user the document was generated for
    pub watermark: Option<String>,
    pub generated_on: chrono::NaiveDate,
}

/// Render one section, or every present section, to PDF bytes.
pub fn render(
    section: ExportSection,
    content: &GeneratedContent,
    options: &PdfOptions,
) -> Result<Vec<u8>, AppError> {
    match section {
        ExportSection::Section(t) if !content.has_content(t) => {
            return Err(AppError::BadRequest(format!(
                "No {} content to export",
                t.title()
            )));
        }
        ExportSection::All if !ContentType::ALL.iter().any(|t| content.has_content(*t)) => {
            return Err(AppError::BadRequest("No content to export".to_string()));
        }
        _ => {}
    }

    let mut writer = Writer::new(&options.title)?;
    writer.header(options);

    match section {
        ExportSection::Section(t) => writer.single_section(t, content),
        ExportSection::All => writer.all_sections(content),
    }

    writer.finish()
}

/// Capitalize the first letter ("university" -> "University").
pub fn display_difficulty(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn color((r, g, b): Rgb8) -> Color {
    Color::Rgb(Rgb::new(
        r as f32 / 255.0,
        g as f32 / 255.0,
        b as f32 / 255.0,
        None,
    ))
}

/// Builtin fonts only cover Latin-1; typographic punctuation is folded to
/// ASCII and anything else becomes '?'.
fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' | '\u{2212}' => '-',
            '\u{2022}' => '*',
            ' '..='~' | '\u{A1}'..='\u{FF}' => c,
            c if c.is_whitespace() => ' ',
            _ => '?',
        })
        .collect()
}

fn text_width(text: &str, size: f32, bold: bool) -> f32 {
    let em = if bold { 0.55 } else { 0.5 };
    text.chars().count() as f32 * size * em * PT_TO_MM
}

/// Greedy word wrap to `width` millimetres. Explicit newlines are kept.
fn wrap(text: &str, width: f32, size: f32, bold: bool) -> Vec<String> {
    let em = if bold { 0.55 } else { 0.5 };
    let max_chars = ((width / (size * em * PT_TO_MM)) as usize).max(1);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let word: Vec<char> = word.chars().collect();
            for chunk in word.chunks(max_chars) {
                let chunk: String = chunk.iter().collect();
                let needed = if line.is_empty() {
                    chunk.chars().count()
                } else {
                    line.chars().count() + 1 + chunk.chars().count()
                };
                if needed > max_chars && !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                }
                if !line.is_empty() {
                    line.push(' ');
                }
                line.push_str(&chunk);
            }
        }
        lines.push(line);
    }

    // Drop trailing blank lines from a trailing newline
    while lines.len() > 1 && lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

struct Column {
    header: &'static str,
    width: f32,
    bold: bool,
    centered: bool,
}

struct Cell {
    text: String,
    color: Rgb8,
}

impl Cell {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: BLACK,
        }
    }
}

struct TableStyle {
    font_size: f32,
    header_size: f32,
    padding: f32,
}

const SECTION_TABLE: TableStyle = TableStyle {
    font_size: 10.0,
    header_size: 11.0,
    padding: 3.0,
};

const COMBINED_TABLE: TableStyle = TableStyle {
    font_size: 9.0,
    header_size: 10.0,
    padding: 2.5,
};

struct Writer {
    doc: PdfDocumentReference,
    pages: Vec<(PdfPageIndex, PdfLayerIndex)>,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    /// Current position from the top edge
    y: f32,
}

impl Writer {
    fn new(title: &str) -> Result<Self, AppError> {
        let (doc, page, layer) =
            PdfDocument::new(sanitize(title), Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| AppError::Pdf(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| AppError::Pdf(e.to_string()))?;

        Ok(Self {
            doc,
            pages: vec![(page, layer)],
            regular,
            bold,
            y: BODY_START,
        })
    }

    fn layer(&self) -> PdfLayerReference {
        let (page, layer) = self.pages[self.pages.len() - 1];
        self.doc.get_page(page).get_layer(layer)
    }

    #[allow(clippy::too_many_arguments)]
    fn text_on(
        &self,
        layer: &PdfLayerReference,
        text: &str,
        size: f32,
        x: f32,
        y: f32,
        bold: bool,
        rgb: Rgb8,
    ) {
        let font = if bold { &self.bold } else { &self.regular };
        layer.set_fill_color(color(rgb));
        layer.use_text(sanitize(text), size, Mm(x), Mm(PAGE_H - y), font);
    }

    fn text(&self, text: &str, size: f32, x: f32, y: f32, bold: bool, rgb: Rgb8) {
        self.text_on(&self.layer(), text, size, x, y, bold, rgb);
    }

    fn centered(&self, text: &str, size: f32, y: f32, bold: bool, rgb: Rgb8) {
        let x = ((PAGE_W - text_width(text, size, bold)) / 2.0).max(MARGIN / 2.0);
        self.text(text, size, x, y, bold, rgb);
    }

    fn line(&self, from: (f32, f32), to: (f32, f32), rgb: Rgb8, thickness: f32) {
        let layer = self.layer();
        layer.set_outline_color(color(rgb));
        layer.set_outline_thickness(thickness);
        layer.add_line(Line {
            points: vec![
                (Point::new(Mm(from.0), Mm(PAGE_H - from.1)), false),
                (Point::new(Mm(to.0), Mm(PAGE_H - to.1)), false),
            ],
            is_closed: false,
        });
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        self.pages.push((page, layer));
        self.y = CONTINUED_TOP;
    }

    /// Start a new page when the cursor is past `limit` (from the top).
    fn break_after(&mut self, limit: f32) {
        if self.y > limit {
            self.new_page();
        }
    }

    fn header(&mut self, options: &PdfOptions) {
        self.centered(APP_HEADER, 20.0, 15.0, true, BLACK);
        self.centered(&options.title, 16.0, 25.0, true, BLACK);

        if let Some(difficulty) = options.difficulty.as_deref().filter(|d| !d.is_empty()) {
            self.centered(
                &format!("Difficulty Level: {}", difficulty),
                12.0,
                33.0,
                false,
                GREY,
            );
        }

        let date = options.generated_on.format("%B %-d, %Y");
        self.centered(
            &format!("Generated on {}", date),
            10.0,
            40.0,
            false,
            LIGHT_GREY,
        );

        if let Some(name) = options.watermark.as_deref().filter(|n| !n.is_empty()) {
            self.centered(
                &format!("Generated for: {}", name),
                9.0,
                47.0,
                false,
                WATERMARK_GREY,
            );
        }

        self.line((MARGIN, 50.0), (PAGE_W - MARGIN, 50.0), RULE_GREY, 0.5);
        self.y = BODY_START;
    }

    /// Wrapped text at the cursor, breaking pages as needed.
    fn paragraph(
        &mut self,
        text: &str,
        size: f32,
        line_height: f32,
        indent: f32,
        bold: bool,
        rgb: Rgb8,
    ) {
        for line in wrap(text, CONTENT_W - indent, size, bold) {
            if self.y > BODY_BOTTOM {
                self.new_page();
            }
            self.text(&line, size, MARGIN + indent, self.y, bold, rgb);
            self.y += line_height;
        }
    }

    fn section_heading(&mut self, title: &str) {
        self.break_after(PAGE_H - 40.0);
        self.text(title, 14.0, MARGIN, self.y, true, ACCENT);
        self.y += 8.0;
    }

    fn table(&mut self, columns: &[Column], rows: Vec<Vec<Cell>>, style: &TableStyle) {
        let total: f32 = columns.iter().map(|c| c.width).sum();
        let x0 = (PAGE_W - total) / 2.0;
        let line_h = style.font_size * PT_TO_MM * 1.3;

        let header_cells: Vec<Cell> = columns
            .iter()
            .map(|c| Cell {
                text: c.header.to_string(),
                color: ACCENT,
            })
            .collect();

        self.table_row(columns, &header_cells, x0, style.header_size, true, style, line_h);

        for row in rows {
            let height = row_height(columns, &row, style, line_h);
            if self.y + height > BODY_BOTTOM {
                self.new_page();
                self.table_row(columns, &header_cells, x0, style.header_size, true, style, line_h);
            }
            self.table_row(columns, &row, x0, style.font_size, false, style, line_h);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn table_row(
        &mut self,
        columns: &[Column],
        cells: &[Cell],
        x0: f32,
        size: f32,
        is_header: bool,
        style: &TableStyle,
        line_h: f32,
    ) {
        let height = if is_header {
            size * PT_TO_MM * 1.3 + 2.0 * style.padding
        } else {
            row_height(columns, cells, style, line_h)
        };
        let top = self.y;
        let total: f32 = columns.iter().map(|c| c.width).sum();
        let layer = self.layer();

        let mut x = x0;
        for (column, cell) in columns.iter().zip(cells) {
            let bold = is_header || column.bold;
            let inner = column.width - 2.0 * style.padding;
            for (i, line) in wrap(&cell.text, inner, size, bold).iter().enumerate() {
                let tx = if column.centered {
                    x + (column.width - text_width(line, size, bold)) / 2.0
                } else {
                    x + style.padding
                };
                let baseline = top + style.padding + (i as f32 + 1.0) * line_h - line_h * 0.25;
                self.text_on(&layer, line, size, tx, baseline, bold, cell.color);
            }
            x += column.width;
        }

        let border = if is_header { ACCENT } else { RULE_GREY };
        let thickness = if is_header { 1.0 } else { 0.5 };
        self.line((x0, top), (x0 + total, top), border, thickness);
        self.line((x0, top + height), (x0 + total, top + height), border, thickness);
        let mut x = x0;
        self.line((x, top), (x, top + height), RULE_GREY, 0.5);
        for column in columns {
            x += column.width;
            self.line((x, top), (x, top + height), RULE_GREY, 0.5);
        }

        self.y = top + height;
    }

    fn mcqs(&mut self, mcqs: &[Mcq], question_size: f32, option_size: f32, limit: f32) {
        let (q_line, o_line) = if question_size > 10.0 {
            (6.0, 5.0)
        } else {
            (5.0, 4.0)
        };

        for (index, mcq) in mcqs.iter().enumerate() {
            self.break_after(limit);

            self.paragraph(
                &format!("{}. {}", index + 1, mcq.question),
                question_size,
                q_line,
                0.0,
                true,
                BLACK,
            );
            self.y += 3.0;

            for (opt_index, option) in mcq.options.iter().enumerate() {
                let correct = opt_index as i64 == mcq.correct_answer;
                let letter = (b'A' + opt_index as u8) as char;
                self.paragraph(
                    &format!("{}. {}", letter, option),
                    option_size,
                    o_line,
                    5.0,
                    correct,
                    if correct { GREEN } else { BLACK },
                );
                self.y += 2.0;
            }
            self.y += 6.0;
        }
    }

    fn single_section(&mut self, content_type: ContentType, content: &GeneratedContent) {
        match content_type {
            ContentType::Summary => self.paragraph(
                content.summary.as_deref().unwrap_or_default(),
                12.0,
                6.0,
                0.0,
                false,
                BLACK,
            ),
            ContentType::KidsExplanation => self.paragraph(
                content.kids_explanation.as_deref().unwrap_or_default(),
                12.0,
                6.0,
                0.0,
                false,
                BLACK,
            ),
            ContentType::ProfessionalExplanation => self.paragraph(
                content.professional_explanation.as_deref().unwrap_or_default(),
                12.0,
                6.0,
                0.0,
                false,
                BLACK,
            ),
            ContentType::Flashcards => {
                let rows = flashcard_rows(content);
                self.table(
                    &[
                        numbered(15.0),
                        text_column("Question", 80.0, false),
                        text_column("Answer", 80.0, false),
                    ],
                    rows,
                    &SECTION_TABLE,
                );
            }
            ContentType::TrueFalse => {
                let rows = true_false_rows(content);
                self.table(
                    &[
                        numbered(15.0),
                        text_column("Statement", 135.0, false),
                        answer_column(25.0),
                    ],
                    rows,
                    &SECTION_TABLE,
                );
            }
            ContentType::Definitions => {
                let rows = content
                    .definitions
                    .iter()
                    .flatten()
                    .enumerate()
                    .map(|(i, d)| {
                        vec![
                            Cell::plain((i + 1).to_string()),
                            Cell::plain(d.term.clone()),
                            Cell::plain(d.definition.clone()),
                        ]
                    })
                    .collect();
                self.table(
                    &[
                        numbered(15.0),
                        text_column("Term", 45.0, true),
                        text_column("Definition", 115.0, false),
                    ],
                    rows,
                    &SECTION_TABLE,
                );
            }
            ContentType::Mcqs => {
                let mcqs = content.mcqs.as_deref().unwrap_or_default();
                self.mcqs(mcqs, 11.0, 10.0, PAGE_H - 60.0);
            }
        }
    }

    fn all_sections(&mut self, content: &GeneratedContent) {
        let texts = [
            ("Summary", &content.summary),
            ("Kids Mode Explanation", &content.kids_explanation),
            ("Professional Explanation", &content.professional_explanation),
        ];
        for (title, text) in texts {
            if let Some(text) = text.as_deref().filter(|t| !t.trim().is_empty()) {
                self.section_heading(title);
                self.paragraph(text, 10.0, 5.0, 0.0, false, BLACK);
                self.y += 12.0;
            }
        }

        if content.has_content(ContentType::Definitions) {
            self.break_after(PAGE_H - 80.0);
            self.section_heading(ContentType::Definitions.title());
            let rows = content
                .definitions
                .iter()
                .flatten()
                .map(|d| vec![Cell::plain(d.term.clone()), Cell::plain(d.definition.clone())])
                .collect();
            self.table(
                &[
                    text_column("Term", 50.0, true),
                    text_column("Definition", 125.0, false),
                ],
                rows,
                &COMBINED_TABLE,
            );
            self.y += 12.0;
        }

        if content.has_content(ContentType::Flashcards) {
            self.break_after(PAGE_H - 80.0);
            self.section_heading(ContentType::Flashcards.title());
            self.table(
                &[
                    numbered(12.0),
                    text_column("Question", 80.0, false),
                    text_column("Answer", 80.0, false),
                ],
                flashcard_rows(content),
                &COMBINED_TABLE,
            );
            self.y += 12.0;
        }

        if content.has_content(ContentType::TrueFalse) {
            self.break_after(PAGE_H - 80.0);
            self.section_heading(ContentType::TrueFalse.title());
            self.table(
                &[
                    numbered(12.0),
                    text_column("Statement", 140.0, false),
                    answer_column(20.0),
                ],
                true_false_rows(content),
                &COMBINED_TABLE,
            );
            self.y += 12.0;
        }

        if content.has_content(ContentType::Mcqs) {
            self.new_page();
            self.section_heading(ContentType::Mcqs.title());
            let mcqs = content.mcqs.as_deref().unwrap_or_default();
            self.mcqs(mcqs, 10.0, 9.0, PAGE_H - 50.0);
        }
    }

    fn finish(self) -> Result<Vec<u8>, AppError> {
        let count = self.pages.len();
        for (i, (page, layer)) in self.pages.iter().enumerate() {
            let layer = self.doc.get_page(*page).get_layer(*layer);
            let label = format!("Page {} of {}", i + 1, count);
            let x = (PAGE_W - text_width(&label, 9.0, false)) / 2.0;
            self.text_on(&layer, &label, 9.0, x, PAGE_H - 10.0, false, LIGHT_GREY);
        }

        self.doc
            .save_to_bytes()
            .map_err(|e| AppError::Pdf(e.to_string()))
    }
}

fn row_height(columns: &[Column], cells: &[Cell], style: &TableStyle, line_h: f32) -> f32 {
    let lines = columns
        .iter()
        .zip(cells)
        .map(|(column, cell)| {
            wrap(
                &cell.text,
                column.width - 2.0 * style.padding,
                style.font_size,
                column.bold,
            )
            .len()
        })
        .max()
        .unwrap_or(1);
    lines as f32 * line_h + 2.0 * style.padding
}

fn numbered(width: f32) -> Column {
    Column {
        header: "#",
        width,
        bold: false,
        centered: true,
    }
}

fn text_column(header: &'static str, width: f32, bold: bool) -> Column {
    Column {
        header,
        width,
        bold,
        centered: false,
    }
}

fn answer_column(width: f32) -> Column {
    Column {
        header: "Answer",
        width,
        bold: true,
        centered: true,
    }
}

fn flashcard_rows(content: &GeneratedContent) -> Vec<Vec<Cell>> {
    content
        .flashcards
        .iter()
        .flatten()
        .enumerate()
        .map(|(i, card)| {
            vec![
                Cell::plain((i + 1).to_string()),
                Cell::plain(card.question.clone()),
                Cell::plain(card.answer.clone()),
            ]
        })
        .collect()
}

fn true_false_rows(content: &GeneratedContent) -> Vec<Vec<Cell>> {
    content
        .true_false
        .iter()
        .flatten()
        .enumerate()
        .map(|(i, item)| {
            let (label, rgb) = if item.answer {
                ("True", GREEN)
            } else {
                ("False", RED)
            };
            vec![
                Cell::plain((i + 1).to_string()),
                Cell::plain(item.statement.clone()),
                Cell {
                    text: label.to_string(),
                    color: rgb,
                },
            ]
        })
        .collect()
}
