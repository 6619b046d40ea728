// src/common/csv.rs

// Caracteres que planilhas interpretam como início de fórmula.
const FORMULA_PREFIXES: [char; 6] = ['=', '+', '-', '@', '\t', '\r'];

/// Escapa um campo para CSV: neutraliza fórmulas com `'` e sempre cita o valor.
pub fn escape_field(value: &str) -> String {
    let guarded = if value.starts_with(FORMULA_PREFIXES) {
        format!("'{}", value)
    } else {
        value.to_string()
    };
    format!("\"{}\"", guarded.replace('"', "\"\""))
}

#[derive(Debug, Default)]
pub struct CsvWriter {
    buffer: String,
}

impl CsvWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_record<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let line: Vec<String> = fields.into_iter().map(|f| escape_field(f.as_ref())).collect();
        self.buffer.push_str(&line.join(","));
        self.buffer.push_str("\r\n");
    }

    pub fn finish(self) -> String {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formula_prefixes_are_neutralised() {
        assert_eq!(escape_field("=1+1"), "\"'=1+1\"");
        assert_eq!(escape_field("+54 341"), "\"'+54 341\"");
        assert_eq!(escape_field("-3"), "\"'-3\"");
        assert_eq!(escape_field("@SUM(A1)"), "\"'@SUM(A1)\"");
        assert_eq!(escape_field("\tx"), "\"'\tx\"");
        assert_eq!(escape_field("Habilitación"), "\"Habilitación\"");
    }

    #[test]
    fn quotes_are_doubled() {
        assert_eq!(escape_field("Seguro \"integral\""), "\"Seguro \"\"integral\"\"\"");
    }

    #[test]
    fn writer_joins_records() {
        let mut w = CsvWriter::new();
        w.write_record(["a", "b"]);
        w.write_record(["=c", "d,e"]);
        assert_eq!(w.finish(), "\"a\",\"b\"\r\n\"'=c\",\"d,e\"\r\n");
    }
}
