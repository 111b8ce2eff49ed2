//! One-page PDF invoices, rendered in memory with lopdf.

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

use tasksmith_core::{Order, User};

/// US letter, in PDF points.
pub const LETTER_WIDTH: i64 = 612;
pub const LETTER_HEIGHT: i64 = 792;

const LEFT_MARGIN: i64 = 100;
const FONT_SIZE: i64 = 12;
/// Distance of each line from the top edge, in points.
const LINE_OFFSETS: [i64; 5] = [50, 100, 130, 160, 190];

#[derive(Debug, thiserror::Error)]
pub enum InvoiceError {
    #[error("failed to encode PDF content: {0}")]
    Encode(#[from] lopdf::Error),
    #[error("failed to write PDF: {0}")]
    Write(#[from] std::io::Error),
}

/// Text content of an invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    lines: [String; 5],
}

impl Invoice {
    pub fn for_order(order: &Order, customer: &User) -> Self {
        Self {
            lines: [
                format!("Invoice for Order #{}", order.id),
                format!("Customer: {} ({})", customer.full_name(), customer.email),
                format!("Product: {}", order.product_name),
                format!("Price: ${}", order.price),
                format!("Date: {}", order.created_at.format("%Y-%m-%d")),
            ],
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Render a single US-letter page, Helvetica 12pt, one line per field.
    pub fn render_pdf(&self) -> Result<Vec<u8>, InvoiceError> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut operations = Vec::with_capacity(self.lines.len() * 4);
        for (line, offset) in self.lines.iter().zip(LINE_OFFSETS) {
            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![Object::Name(b"F1".to_vec()), Object::Integer(FONT_SIZE)],
                ),
                Operation::new(
                    "Td",
                    vec![
                        Object::Integer(LEFT_MARGIN),
                        Object::Integer(LETTER_HEIGHT - offset),
                    ],
                ),
                Operation::new("Tj", vec![Object::string_literal(line.as_str())]),
                Operation::new("ET", vec![]),
            ]);
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), LETTER_WIDTH.into(), LETTER_HEIGHT.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)?;
        Ok(buffer)
    }
}
