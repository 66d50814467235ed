//! PDF serialization of a paginated layout with printpdf.

use super::layout::{
    CONTENT_WIDTH_MM, DocumentLayout, Element, MARGIN_MM, PAGE_HEIGHT_MM, PAGE_WIDTH_MM, Placed,
    TABLE_SIZE_PT,
};
use crate::config::ReportStyle;
use crate::error::{ReportingError, Result};
use crate::reporting::charts::ChartSet;
use crate::utils::truncate_label;
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfLayerReference, Point, Rect, Rgb,
};

/// Millimetres per point.
const PT_TO_MM: f32 = 0.3528;
/// Average Helvetica glyph width as a fraction of the font size.
const GLYPH_WIDTH: f32 = 0.5;
const FOOTER_SIZE_PT: f32 = 9.0;

fn document_error<E: std::fmt::Display>(e: E) -> ReportingError {
    ReportingError::Document(e.to_string())
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

/// Serialize `layout` to PDF bytes. Chart elements are drawn from `charts`.
pub(crate) fn render_pdf(
    layout: &DocumentLayout,
    charts: &ChartSet,
    style: &ReportStyle,
) -> Result<Vec<u8>> {
    let (doc, first_page, first_layer) = PdfDocument::new(
        style.title.as_str(),
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Content",
    );
    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(document_error)?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(document_error)?,
    };

    let total = layout.page_count();
    for (index, page) in layout.pages.iter().enumerate() {
        let (page_index, layer_index) = if index == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Content")
        };
        let layer = doc.get_page(page_index).get_layer(layer_index);

        for placed in &page.elements {
            draw(&layer, placed, charts, style, &fonts)?;
        }

        let footer = format!("Page {} of {}", index + 1, total);
        set_fill(&layer, (90, 90, 90));
        layer.use_text(
            footer.as_str(),
            FOOTER_SIZE_PT,
            Mm(centered_x(&footer, FOOTER_SIZE_PT)),
            Mm(MARGIN_MM / 2.0),
            &fonts.regular,
        );
    }

    doc.save_to_bytes().map_err(document_error)
}

fn draw(
    layer: &PdfLayerReference,
    placed: &Placed,
    charts: &ChartSet,
    style: &ReportStyle,
    fonts: &Fonts,
) -> Result<()> {
    let top = PAGE_HEIGHT_MM - MARGIN_MM - placed.top;
    let bottom = top - placed.height;

    match &placed.element {
        Element::Text {
            text,
            size,
            bold,
            centered,
        } => {
            let x = if *centered {
                centered_x(text, *size)
            } else {
                MARGIN_MM
            };
            set_fill(layer, (0, 0, 0));
            let font = if *bold { &fonts.bold } else { &fonts.regular };
            layer.use_text(text.as_str(), *size, Mm(x), Mm(baseline(top, placed.height, *size)), font);
        }
        Element::TableRow { cells, header } => {
            draw_row(layer, cells, *header, top, bottom, placed.height, style, fonts);
        }
        Element::Chart { column } => {
            let Some(Ok(chart)) = charts.get(column) else {
                return Err(ReportingError::ContractViolation(format!(
                    "layout places a chart for '{}' that was not rendered",
                    column
                )));
            };
            let bitmap = image::load_from_memory_with_format(&chart.png, image::ImageFormat::Png)
                .map_err(document_error)?;
            let dpi = chart.width as f32 * 25.4 / CONTENT_WIDTH_MM;
            Image::from_dynamic_image(&bitmap).add_to_layer(
                layer.clone(),
                ImageTransform {
                    translate_x: Some(Mm(MARGIN_MM)),
                    translate_y: Some(Mm(bottom)),
                    dpi: Some(dpi),
                    ..Default::default()
                },
            );
        }
        Element::Note(note) => {
            set_fill(layer, (120, 120, 120));
            layer.use_text(
                note.as_str(),
                TABLE_SIZE_PT,
                Mm(MARGIN_MM),
                Mm(baseline(top, placed.height, TABLE_SIZE_PT)),
                &fonts.regular,
            );
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn draw_row(
    layer: &PdfLayerReference,
    cells: &[String],
    header: bool,
    top: f32,
    bottom: f32,
    height: f32,
    style: &ReportStyle,
    fonts: &Fonts,
) {
    let right = MARGIN_MM + CONTENT_WIDTH_MM;
    if header {
        set_fill(layer, style.primary_color());
        layer.add_rect(
            Rect::new(Mm(MARGIN_MM), Mm(bottom), Mm(right), Mm(top)).with_mode(PaintMode::Fill),
        );
        set_fill(layer, (255, 255, 255));
    } else {
        layer.set_outline_color(rgb((210, 210, 210)));
        layer.set_outline_thickness(0.3);
        layer.add_line(Line {
            points: vec![
                (Point::new(Mm(MARGIN_MM), Mm(bottom)), false),
                (Point::new(Mm(right), Mm(bottom)), false),
            ],
            is_closed: false,
        });
        set_fill(layer, (0, 0, 0));
    }

    let columns = cells.len().max(1);
    let column_width = CONTENT_WIDTH_MM / columns as f32;
    let max_chars = (column_width / (TABLE_SIZE_PT * GLYPH_WIDTH * PT_TO_MM)) as usize;
    let font = if header { &fonts.bold } else { &fonts.regular };
    for (i, cell) in cells.iter().enumerate() {
        let x = MARGIN_MM + 1.5 + column_width * i as f32;
        layer.use_text(
            truncate_label(cell, max_chars.saturating_sub(1)),
            TABLE_SIZE_PT,
            Mm(x),
            Mm(baseline(top, height, TABLE_SIZE_PT)),
            font,
        );
    }
}

fn baseline(top: f32, height: f32, size: f32) -> f32 {
    let glyph = size * PT_TO_MM;
    top - (height + glyph) / 2.0 + glyph * 0.25
}

fn centered_x(text: &str, size: f32) -> f32 {
    let width = text.chars().count() as f32 * size * GLYPH_WIDTH * PT_TO_MM;
    (MARGIN_MM + (CONTENT_WIDTH_MM - width) / 2.0).max(MARGIN_MM)
}

fn rgb(color: (u8, u8, u8)) -> Color {
    Color::Rgb(Rgb::new(
        color.0 as f32 / 255.0,
        color.1 as f32 / 255.0,
        color.2 as f32 / 255.0,
        None,
    ))
}

fn set_fill(layer: &PdfLayerReference, color: (u8, u8, u8)) {
    layer.set_fill_color(rgb(color));
}
