// src/common/mime.rs

// Tipos aceitos como evidência e detecção pelo conteúdo (magic bytes).

pub const PDF: &str = "application/pdf";
pub const PNG: &str = "image/png";
pub const JPEG: &str = "image/jpeg";
pub const WEBP: &str = "image/webp";
pub const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const DOC: &str = "application/msword";
pub const XLS: &str = "application/vnd.ms-excel";
pub const TEXT: &str = "text/plain";

const ZIP: &str = "application/zip";
const OLE: &str = "application/x-ole-storage";
const BINARY: &str = "application/octet-stream";

pub const ALLOWED: [&str; 9] = [PDF, PNG, JPEG, WEBP, DOCX, XLSX, DOC, XLS, TEXT];

/// Bytes lidos do início do objeto para a detecção.
pub const SNIFF_LEN: u64 = 512;

/// Compara ignorando parâmetros (`text/plain; charset=utf-8`) e maiúsculas.
pub fn essence(mime: &str) -> String {
    mime.split(';').next().unwrap_or_default().trim().to_ascii_lowercase()
}

pub fn is_allowed(mime: &str) -> bool {
    let m = essence(mime);
    ALLOWED.contains(&m.as_str())
}

/// Detecta o tipo real pelo cabeçalho do arquivo. Contêineres ZIP e OLE não
/// distinguem Word de Excel nos primeiros bytes; nesses casos o tipo declarado
/// é aceito se for compatível com o contêiner.
pub fn detect(bytes: &[u8], declared: &str) -> &'static str {
    let declared = essence(declared);

    if bytes.starts_with(b"%PDF-") {
        PDF
    } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        PNG
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        JPEG
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        WEBP
    } else if bytes.starts_with(b"PK\x03\x04") {
        match declared.as_str() {
            DOCX => DOCX,
            XLSX => XLSX,
            _ => ZIP,
        }
    } else if bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]) {
        match declared.as_str() {
            DOC => DOC,
            XLS => XLS,
            _ => OLE,
        }
    } else if looks_like_text(bytes) {
        TEXT
    } else {
        BINARY
    }
}

// UTF-8 válido (o prefixo pode cortar um caractere no meio) e sem NUL.
fn looks_like_text(bytes: &[u8]) -> bool {
    if bytes.is_empty() || bytes.contains(&0) {
        return false;
    }
    match std::str::from_utf8(bytes) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none() && e.valid_up_to() > 0,
    }
}

/// Nome seguro para compor a chave no storage: só [A-Za-z0-9._-], sem "..".
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let cleaned = cleaned.replace("..", "_");
    let cleaned = cleaned.trim_matches('.');
    let cleaned: String = cleaned.chars().take(120).collect();
    if cleaned.is_empty() { "archivo".to_string() } else { cleaned }
}
