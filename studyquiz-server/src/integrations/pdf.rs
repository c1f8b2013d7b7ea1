//! PDF page counting without a PDF parser
//!
//! Counts `/Type /Page` objects (not `/Pages` tree nodes). When none are
//! visible the largest `/Count` on a `/Type /Pages` node is used instead,
//! which is the page tree root. Files that keep both the pages and the page
//! tree inside compressed object streams still report 0.

use once_cell::sync::Lazy;
use regex::bytes::Regex;

static PAGE_OBJECT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/Type\s*/Page\b").expect("valid page regex"));

/// One dictionary body (no nested `<<`), so `/Type` and `/Count` can come in either order.
static DICT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s-u)<<((?:[^<>]|<[^<]|>[^>])*)>>").expect("valid dict regex"));

static PAGES_TYPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/Type\s*/Pages\b").expect("valid pages regex"));

static COUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/Count\s+(\d+)").expect("valid count regex"));

pub fn is_pdf(file_name: &str) -> bool {
    file_name.to_ascii_lowercase().ends_with(".pdf")
}

pub fn count_pdf_pages(data: &[u8]) -> i32 {
    let count = PAGE_OBJECT_RE.find_iter(data).count();
    if count > 0 {
        return i32::try_from(count).unwrap_or(i32::MAX);
    }
    page_tree_count(data).unwrap_or(0)
}

fn page_tree_count(data: &[u8]) -> Option<i32> {
    DICT_RE
        .captures_iter(data)
        .filter_map(|caps| caps.get(1))
        .map(|body| body.as_bytes())
        .filter(|body| PAGES_TYPE_RE.is_match(body))
        .filter_map(|body| COUNT_RE.captures(body))
        .filter_map(|caps| std::str::from_utf8(caps.get(1)?.as_bytes()).ok()?.parse().ok())
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_page_objects_not_page_trees() {
        let pdf = b"%PDF-1.4\n1 0 obj << /Type /Pages /Kids [2 0 R 3 0 R] /Count 2 >>\n\
                    2 0 obj << /Type /Page /Parent 1 0 R >>\n\
                    3 0 obj <</Type/Page/Parent 1 0 R>>\n%%EOF";
        assert_eq!(count_pdf_pages(pdf), 2);
        assert_eq!(count_pdf_pages(b"not a pdf"), 0);
    }

    #[test]
    fn falls_back_to_page_tree_root_count() {
        // pages live in a compressed object stream; only the tree nodes are visible
        let pdf = b"%PDF-1.5\n1 0 obj <</Count 12 /Kids [4 0 R 5 0 R] /Type /Pages>>\n\
                    4 0 obj << /Type /Pages /Parent 1 0 R /Count 7 >>\n\
                    6 0 obj << /Type /Outlines /Count 40 >>\n\
                    7 0 obj << /Type /ObjStm /N 12 /Length 300 /Filter /FlateDecode >>\n%%EOF";
        assert_eq!(count_pdf_pages(pdf), 12);
    }

    #[test]
    fn fully_compressed_file_reports_zero() {
        let pdf = b"%PDF-1.5\n7 0 obj << /Type /ObjStm /N 30 /Length 900 >>\nstream\n\x78\x9c...\nendstream\n%%EOF";
        assert_eq!(count_pdf_pages(pdf), 0);
    }

    #[test]
    fn pdf_detection_by_extension() {
        assert!(is_pdf("Notes.PDF"));
        assert!(!is_pdf("notes.pdf.txt"));
    }
}
