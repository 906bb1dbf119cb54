//! Doctype table and the document mode it selects

use phf::{phf_map, phf_set};

/// Doctype shorthands accepted by `doctype <name>`
pub static DOCTYPES: phf::Map<&'static str, &'static str> = phf_map! {
    "default" => "<!DOCTYPE html>",
    "xml" => "<?xml version=\"1.0\" encoding=\"utf-8\" ?>",
    "transitional" => "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Transitional//EN\" \"http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd\">",
    "strict" => "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Strict//EN\" \"http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd\">",
    "frameset" => "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Frameset//EN\" \"http://www.w3.org/TR/xhtml1/DTD/xhtml1-frameset.dtd\">",
    "1.1" => "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.1//EN\" \"http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd\">",
    "basic" => "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML Basic 1.1//EN\" \"http://www.w3.org/TR/xhtml-basic/xhtml-basic11.dtd\">",
    "mobile" => "<!DOCTYPE html PUBLIC \"-//WAPFORUM//DTD XHTML Mobile 1.2//EN\" \"http://www.openmobilealliance.org/tech/DTD/xhtml-mobile12.dtd\">",
    "plist" => "<!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\" \"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">",
};

/// HTML void elements. Outside XML mode these never get a closing tag.
pub static SELF_CLOSING: phf::Set<&'static str> = phf_set! {
    "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen",
    "link", "menuitem", "meta", "param", "source", "track", "wbr",
};

/// Output flavor chosen by the doctype.
///
/// `terse` is HTML5: boolean attributes are written bare and void elements
/// end in `>`. `xml` disables the void element list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentMode {
    pub doctype: Option<String>,
    pub terse: bool,
    pub xml: bool,
}

impl DocumentMode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a doctype by shorthand. Unknown names become `<!DOCTYPE name>`.
    pub fn set_doctype(&mut self, name: &str) {
        let doctype = DOCTYPES
            .get(name.to_lowercase().as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("<!DOCTYPE {}>", name));
        self.terse = doctype.to_lowercase() == "<!doctype html>";
        self.xml = doctype.starts_with("<?xml");
        log::debug!("doctype `{}` (terse: {}, xml: {})", name, self.terse, self.xml);
        self.doctype = Some(doctype);
    }

    pub fn is_self_closing(&self, tag: &str) -> bool {
        !self.xml && SELF_CLOSING.contains(tag)
    }
}
