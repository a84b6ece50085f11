//! Upload Page
//!
//! Renders the single HTML page: upload form, optional status message and
//! the list of stored files with download links.

/// Message shown when the form was submitted without a file
pub const EMPTY_UPLOAD_MESSAGE: &str = "Please select a file to upload.";

/// Message shown when an upload name fails the containment check
pub const INVALID_PATH_MESSAGE: &str = "Invalid file path";

/// Message shown when the upload could not be written
pub const STORE_FAILED_MESSAGE: &str = "Failed to store file";

/// Message shown after a successful upload
pub fn uploaded_message(safe_name: &str) -> String {
    format!("File uploaded successfully: {}", safe_name)
}

/// Render the upload/listing page
pub fn render(files: &[String], message: Option<&str>) -> String {
    let mut html = String::from("<!DOCTYPE html>\n");
    html.push_str("<html lang=\"en\">\n<head>\n");
    html.push_str("  <meta charset=\"utf-8\">\n");
    html.push_str("  <title>WolfDrop</title>\n");
    html.push_str("</head>\n<body>\n");
    html.push_str("  <h1>WolfDrop</h1>\n");

    if let Some(message) = message {
        html.push_str(&format!("  <p class=\"message\">{}</p>\n", html_escape(message)));
    }

    html.push_str("  <form method=\"post\" action=\"/upload\" enctype=\"multipart/form-data\">\n");
    html.push_str("    <input type=\"file\" name=\"file\">\n");
    html.push_str("    <button type=\"submit\">Upload</button>\n");
    html.push_str("  </form>\n");

    html.push_str("  <h2>Files</h2>\n");
    if files.is_empty() {
        html.push_str("  <p>No files uploaded yet.</p>\n");
    } else {
        html.push_str("  <ul>\n");
        for name in files {
            html.push_str(&format!(
                "    <li><a href=\"/download/{}\">{}</a></li>\n",
                encode_path_segment(name),
                html_escape(name)
            ));
        }
        html.push_str("  </ul>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

/// Escape text for use in HTML content and attribute values
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Percent-encode a file name as a single URL path segment
pub(crate) fn encode_path_segment(name: &str) -> String {
    let mut encoded = String::with_capacity(name.len());
    for byte in name.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}
