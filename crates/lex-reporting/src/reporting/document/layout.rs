//! Flow layout of document blocks onto fixed-size pages.
//!
//! Pagination only depends on the blocks: every element has a fixed height,
//! and a page is started whenever the next element would cross the bottom of
//! the content area. Tables repeat their header row on each page they span.
//! Headings never end a page; they move down with the first line of the
//! block that follows them.

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
pub const MARGIN_MM: f32 = 20.0;
/// Space reserved below the content area for the page footer.
pub const FOOTER_MM: f32 = 12.0;
pub const CONTENT_WIDTH_MM: f32 = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;
pub const CONTENT_HEIGHT_MM: f32 = PAGE_HEIGHT_MM - 2.0 * MARGIN_MM - FOOTER_MM;

const TITLE_OFFSET_MM: f32 = 70.0;
const TITLE_HEIGHT_MM: f32 = 16.0;
const TITLE_LINE_MM: f32 = 8.0;
const HEADING_MM: f32 = 12.0;
const SUBHEADING_MM: f32 = 9.0;
const LINE_MM: f32 = 5.5;
const HEADER_ROW_MM: f32 = 7.0;
const ROW_MM: f32 = 6.0;
const NOTE_MM: f32 = 8.0;
const BLOCK_GAP_MM: f32 = 4.0;

/// Characters per wrapped paragraph line at body size.
pub const WRAP_CHARS: usize = 95;

pub const TITLE_SIZE_PT: f32 = 24.0;
pub const TITLE_LINE_SIZE_PT: f32 = 12.0;
pub const HEADING_SIZE_PT: f32 = 16.0;
pub const SUBHEADING_SIZE_PT: f32 = 12.0;
pub const BODY_SIZE_PT: f32 = 10.0;
pub const TABLE_SIZE_PT: f32 = 9.0;

/// Document content before pagination.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Title { title: String, lines: Vec<String> },
    PageBreak,
    Heading(String),
    Subheading(String),
    Paragraph(String),
    Table(Table),
    /// A rendered chart; `aspect` is height over width.
    Chart { column: String, aspect: f32 },
    /// Shown where a chart could not be rendered.
    Placeholder(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// One drawable piece of a page.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Text {
        text: String,
        size: f32,
        bold: bool,
        centered: bool,
    },
    TableRow {
        cells: Vec<String>,
        header: bool,
    },
    Chart {
        column: String,
    },
    Note(String),
}

/// An element placed `top` millimetres below the top of the content area.
#[derive(Debug, Clone, PartialEq)]
pub struct Placed {
    pub top: f32,
    pub height: f32,
    pub element: Element,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub elements: Vec<Placed>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentLayout {
    pub pages: Vec<Page>,
}

impl DocumentLayout {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Heading texts in document order.
    pub fn headings(&self) -> Vec<&str> {
        self.pages
            .iter()
            .flat_map(|p| &p.elements)
            .filter_map(|placed| match &placed.element {
                Element::Text {
                    text,
                    size,
                    bold: true,
                    ..
                } if *size == HEADING_SIZE_PT => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Page index (0-based) of the first heading with this text.
    pub fn page_of(&self, heading: &str) -> Option<usize> {
        self.pages.iter().position(|p| {
            p.elements.iter().any(|placed| {
                matches!(&placed.element, Element::Text { text, size, .. }
                    if text == heading && *size == HEADING_SIZE_PT)
            })
        })
    }

    pub fn charts(&self) -> Vec<&str> {
        self.pages
            .iter()
            .flat_map(|p| &p.elements)
            .filter_map(|placed| match &placed.element {
                Element::Chart { column } => Some(column.as_str()),
                _ => None,
            })
            .collect()
    }
}

struct Paginator {
    pages: Vec<Page>,
    current: Page,
    y: f32,
}

impl Paginator {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Page::default(),
            y: 0.0,
        }
    }

    fn fits(&self, height: f32) -> bool {
        self.y + height <= CONTENT_HEIGHT_MM
    }

    fn break_page(&mut self) {
        if !self.current.elements.is_empty() {
            self.pages.push(std::mem::take(&mut self.current));
        }
        self.y = 0.0;
    }

    /// Place an element, starting a new page first when it does not fit.
    fn place(&mut self, element: Element, height: f32) {
        if !self.fits(height) {
            self.break_page();
        }
        self.current.elements.push(Placed {
            top: self.y,
            height,
            element,
        });
        self.y += height;
    }

    /// Make sure `height` is available, breaking the page otherwise.
    fn reserve(&mut self, height: f32) {
        if !self.fits(height) {
            self.break_page();
        }
    }

    fn gap(&mut self) {
        self.y = (self.y + BLOCK_GAP_MM).min(CONTENT_HEIGHT_MM);
    }

    fn finish(mut self) -> DocumentLayout {
        self.break_page();
        if self.pages.is_empty() {
            self.pages.push(Page::default());
        }
        DocumentLayout { pages: self.pages }
    }
}

/// Lay `blocks` out onto pages.
pub fn paginate(blocks: &[Block]) -> DocumentLayout {
    let mut paginator = Paginator::new();

    for (index, block) in blocks.iter().enumerate() {
        match block {
            Block::Title { title, lines } => {
                paginator.y += TITLE_OFFSET_MM;
                paginator.place(text(title, TITLE_SIZE_PT, true, true), TITLE_HEIGHT_MM);
                for line in lines {
                    paginator.place(text(line, TITLE_LINE_SIZE_PT, false, true), TITLE_LINE_MM);
                }
            }
            Block::PageBreak => paginator.break_page(),
            Block::Heading(heading) => {
                let lead = blocks.get(index + 1).map(lead_height).unwrap_or(0.0);
                paginator.reserve(HEADING_MM + lead);
                paginator.place(text(heading, HEADING_SIZE_PT, true, false), HEADING_MM);
            }
            Block::Subheading(heading) => {
                let lead = blocks.get(index + 1).map(lead_height).unwrap_or(0.0);
                paginator.reserve(SUBHEADING_MM + lead);
                paginator.place(text(heading, SUBHEADING_SIZE_PT, true, false), SUBHEADING_MM);
            }
            Block::Paragraph(body) => {
                for line in wrap(body, WRAP_CHARS) {
                    paginator.place(text(&line, BODY_SIZE_PT, false, false), LINE_MM);
                }
                paginator.gap();
            }
            Block::Table(table) => {
                let header = Element::TableRow {
                    cells: table.headers.clone(),
                    header: true,
                };
                paginator.reserve(HEADER_ROW_MM + if table.rows.is_empty() { 0.0 } else { ROW_MM });
                paginator.place(header.clone(), HEADER_ROW_MM);
                for row in &table.rows {
                    if !paginator.fits(ROW_MM) {
                        paginator.break_page();
                        paginator.place(header.clone(), HEADER_ROW_MM);
                    }
                    paginator.place(
                        Element::TableRow {
                            cells: row.clone(),
                            header: false,
                        },
                        ROW_MM,
                    );
                }
                paginator.gap();
            }
            Block::Chart { column, aspect } => {
                paginator.place(
                    Element::Chart {
                        column: column.clone(),
                    },
                    chart_height(*aspect),
                );
                paginator.gap();
            }
            Block::Placeholder(note) => {
                paginator.place(Element::Note(note.clone()), NOTE_MM);
                paginator.gap();
            }
        }
    }

    paginator.finish()
}

/// Height of the first unbreakable piece of a block.
fn lead_height(block: &Block) -> f32 {
    match block {
        Block::Title { .. } | Block::PageBreak => 0.0,
        Block::Heading(_) => HEADING_MM,
        Block::Subheading(_) => SUBHEADING_MM,
        Block::Paragraph(_) => LINE_MM,
        Block::Table(table) => {
            HEADER_ROW_MM + if table.rows.is_empty() { 0.0 } else { ROW_MM }
        }
        Block::Chart { aspect, .. } => chart_height(*aspect),
        Block::Placeholder(_) => NOTE_MM,
    }
}

fn chart_height(aspect: f32) -> f32 {
    (CONTENT_WIDTH_MM * aspect).clamp(10.0, CONTENT_HEIGHT_MM - HEADING_MM)
}

fn text(value: &str, size: f32, bold: bool, centered: bool) -> Element {
    Element::Text {
        text: value.to_string(),
        size,
        bold,
        centered,
    }
}

/// Greedy word wrap. Words longer than a line are split.
pub fn wrap(body: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in body.split_whitespace() {
        let mut word = word.to_string();
        while word.chars().count() > width {
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            let head: String = word.chars().take(width).collect();
            word = word.chars().skip(width).collect();
            lines.push(head);
        }
        let needed = if line.is_empty() { 0 } else { line.chars().count() + 1 };
        if needed + word.chars().count() > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(&word);
    }
    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table(rows: usize) -> Block {
        Block::Table(Table {
            headers: vec!["Column".to_string(), "Value".to_string()],
            rows: (0..rows)
                .map(|i| vec![format!("c{}", i), i.to_string()])
                .collect(),
        })
    }

    fn header_rows(page: &Page) -> usize {
        page.elements
            .iter()
            .filter(|p| matches!(p.element, Element::TableRow { header: true, .. }))
            .count()
    }

    #[test]
    fn test_empty_document_has_one_page() {
        assert_eq!(paginate(&[]).page_count(), 1);
    }

    #[test]
    fn test_page_break_after_title() {
        let layout = paginate(&[
            Block::Title {
                title: "Report".to_string(),
                lines: vec!["Acme".to_string()],
            },
            Block::PageBreak,
            Block::Heading("Executive Summary".to_string()),
            Block::Paragraph("Quality is high.".to_string()),
        ]);
        assert_eq!(layout.page_count(), 2);
        assert_eq!(layout.page_of("Executive Summary"), Some(1));
    }

    #[test]
    fn test_long_table_repeats_header() {
        let layout = paginate(&[table(100)]);
        assert!(layout.page_count() >= 2);
        for page in &layout.pages {
            assert_eq!(header_rows(page), 1);
        }
        let data_rows: usize = layout
            .pages
            .iter()
            .flat_map(|p| &p.elements)
            .filter(|p| matches!(p.element, Element::TableRow { header: false, .. }))
            .count();
        assert_eq!(data_rows, 100);
    }

    #[test]
    fn test_elements_stay_inside_content_area() {
        let blocks: Vec<Block> = (0..12)
            .flat_map(|i| {
                vec![
                    Block::Heading(format!("Section {}", i)),
                    Block::Chart {
                        column: format!("c{}", i),
                        aspect: 0.5,
                    },
                    table(8),
                ]
            })
            .collect();
        let layout = paginate(&blocks);
        for page in &layout.pages {
            for placed in &page.elements {
                assert!(placed.top + placed.height <= CONTENT_HEIGHT_MM + 1e-3);
            }
        }
        assert_eq!(layout.charts().len(), 12);
    }

    #[test]
    fn test_heading_kept_with_next_block() {
        // Fill most of the first page, then add a heading followed by a chart
        let mut blocks = vec![table(34)];
        blocks.push(Block::Heading("Revenue".to_string()));
        blocks.push(Block::Chart {
            column: "Revenue".to_string(),
            aspect: 0.5,
        });
        let layout = paginate(&blocks);

        let heading_page = layout.page_of("Revenue").unwrap();
        let chart_page = layout
            .pages
            .iter()
            .position(|p| {
                p.elements
                    .iter()
                    .any(|e| matches!(e.element, Element::Chart { .. }))
            })
            .unwrap();
        assert_eq!(heading_page, chart_page);
        assert_eq!(heading_page, 1);
    }

    #[test]
    fn test_pagination_is_pure() {
        let blocks = vec![Block::Heading("A".to_string()), table(80)];
        assert_eq!(paginate(&blocks), paginate(&blocks));
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("one two three", 7), vec!["one two", "three"]);
        assert_eq!(wrap("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap("", 10), vec![""]);
    }
}
