use std::io::Write;

use factuur_store::StoredInvoice;
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

fn text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("-")
}

/// Print stored invoices as one block per row.
pub fn print_invoices(
    w: &mut dyn Write,
    rows: &[StoredInvoice],
    color: ColorMode,
) -> std::io::Result<()> {
    if rows.is_empty() {
        writeln!(w, "No invoices stored.")?;
        return Ok(());
    }

    for row in rows {
        let heading = format!("#{} {}", row.id, text(&row.file_name));
        if color.enabled() {
            writeln!(w, "{}  {}", heading.bold(), row.created_at.dimmed())?;
        } else {
            writeln!(w, "{}  {}", heading, row.created_at)?;
        }
        writeln!(w, "  Supplier:   {}", text(&row.supplier))?;
        writeln!(w, "  Date:       {}", text(&row.invoice_date))?;
        writeln!(
            w,
            "  Amount:     {} (BTW {})",
            text(&row.invoice_amount),
            text(&row.btw_amount)
        )?;
        writeln!(w, "  BTW-nummer: {}", text(&row.btw_number))?;
        writeln!(w, "  KvK:        {}", text(&row.kvk))?;
        if let Some(notes) = row.notes.as_deref().filter(|n| !n.is_empty()) {
            writeln!(w, "  Notes:      {}", notes)?;
        }
        writeln!(w)?;
    }

    writeln!(w, "{} invoice(s)", rows.len())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64) -> StoredInvoice {
        StoredInvoice {
            id,
            created_at: "2024-03-01T09:30:00Z".to_string(),
            file_name: Some("factuur.pdf".to_string()),
            invoice_date: None,
            invoice_amount: Some("121.00".to_string()),
            btw_amount: Some("21.00".to_string()),
            btw_number: None,
            kvk: Some("12345678".to_string()),
            supplier: Some("ACME B.V.".to_string()),
            notes: None,
        }
    }

    fn render(rows: &[StoredInvoice]) -> String {
        let mut buf = Vec::new();
        print_invoices(&mut buf, rows, ColorMode(false)).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn empty_store_message() {
        assert_eq!(render(&[]), "No invoices stored.\n");
    }

    #[test]
    fn null_fields_render_as_dash() {
        let out = render(&[row(7)]);
        assert!(out.starts_with("#7 factuur.pdf  2024-03-01T09:30:00Z\n"));
        assert!(out.contains("  Date:       -\n"));
        assert!(out.contains("  Amount:     121.00 (BTW 21.00)\n"));
        assert!(!out.contains("Notes:"));
        assert!(out.ends_with("1 invoice(s)\n"));
    }
}
