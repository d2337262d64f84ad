//! Certificate artifact rendering.
//!
//! Rendering is deterministic for identical inputs: the certificate id and
//! approval date are supplied by the caller rather than generated here, and
//! the layout is a fixed landscape A4 template.

use chrono::NaiveDate;
use printpdf::{BuiltinFont, Color, Mm, PdfDocument, Rgb};

/// Inputs the renderer consumes. Everything time- or identity-dependent is
/// resolved by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct CertificateInput {
    pub certificate_id: String,
    pub facility_name: String,
    pub approved_on: NaiveDate,
    pub renewable_percentage: f64,
}

/// Supported artifact formats. The vector image variant stands in for the
/// raster snapshot the review surface used to capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateFormat {
    Pdf,
    Svg,
}

/// Rendered artifact plus the metadata needed to attach it to an email.
#[derive(Debug, Clone)]
pub struct Certificate {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: &'static str,
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("certificate field '{field}' is missing or empty")]
    MissingField { field: &'static str },
    #[error("pdf rendering failed: {0}")]
    Pdf(#[from] printpdf::Error),
}

const PAGE_WIDTH_MM: f32 = 297.0;
const PAGE_HEIGHT_MM: f32 = 210.0;

/// Stateless renderer over the fixed certificate template.
#[derive(Debug, Default, Clone, Copy)]
pub struct CertificateRenderer;

impl CertificateRenderer {
    pub fn render(
        &self,
        input: &CertificateInput,
        format: CertificateFormat,
    ) -> Result<Certificate, RenderError> {
        if input.facility_name.trim().is_empty() {
            return Err(RenderError::MissingField {
                field: "facilityName",
            });
        }
        if input.certificate_id.trim().is_empty() {
            return Err(RenderError::MissingField {
                field: "certificateId",
            });
        }

        match format {
            CertificateFormat::Pdf => self.render_pdf(input),
            CertificateFormat::Svg => Ok(self.render_svg(input)),
        }
    }

    fn render_pdf(&self, input: &CertificateInput) -> Result<Certificate, RenderError> {
        let (doc, page, layer) = PdfDocument::new(
            "Certificate of Compliance",
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            "certificate",
        );
        let layer = doc.get_page(page).get_layer(layer);

        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;

        // Fixed offsets approximate centered text for the template's copy;
        // the builtin fonts expose no shaping metrics to center against.
        layer.set_fill_color(Color::Rgb(Rgb::new(0.16, 0.50, 0.73, None)));
        layer.use_text(
            "Certificate of Compliance",
            40.0,
            Mm(58.0),
            Mm(PAGE_HEIGHT_MM - 60.0),
            &bold,
        );

        layer.set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
        layer.use_text(
            "This certifies that",
            20.0,
            Mm(117.0),
            Mm(PAGE_HEIGHT_MM - 85.0),
            &regular,
        );
        layer.use_text(
            input.facility_name.as_str(),
            30.0,
            Mm(80.0),
            Mm(PAGE_HEIGHT_MM - 105.0),
            &bold,
        );
        layer.use_text(
            "has successfully completed the Scope 2 emissions self-assessment",
            16.0,
            Mm(62.0),
            Mm(PAGE_HEIGHT_MM - 125.0),
            &regular,
        );
        layer.use_text(
            format!(
                "Reported renewable energy share: {:.2}%",
                input.renewable_percentage
            ),
            16.0,
            Mm(88.0),
            Mm(PAGE_HEIGHT_MM - 137.0),
            &regular,
        );
        layer.use_text(
            format!("Approved on: {}", input.approved_on.format("%B %-d, %Y")),
            16.0,
            Mm(103.0),
            Mm(PAGE_HEIGHT_MM - 149.0),
            &regular,
        );

        layer.set_fill_color(Color::Rgb(Rgb::new(0.4, 0.4, 0.4, None)));
        layer.use_text(
            format!("Certificate ID: {}", input.certificate_id),
            12.0,
            Mm(105.0),
            Mm(PAGE_HEIGHT_MM - 172.0),
            &regular,
        );
        layer.use_text(
            "Verified by Sustally Application System",
            12.0,
            Mm(108.0),
            Mm(PAGE_HEIGHT_MM - 180.0),
            &regular,
        );

        let bytes = doc.save_to_bytes()?;
        Ok(Certificate {
            bytes,
            content_type: "application/pdf",
            filename: "Certificate.pdf",
        })
    }

    fn render_svg(&self, input: &CertificateInput) -> Certificate {
        let facility = xml_escape(&input.facility_name);
        let certificate_id = xml_escape(&input.certificate_id);
        let approved_on = input.approved_on.format("%B %-d, %Y");
        let markup = format!(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="1123" height="794" viewBox="0 0 1123 794">
  <rect x="0" y="0" width="1123" height="794" fill="#ffffff"/>
  <rect x="24" y="24" width="1075" height="746" fill="none" stroke="#2980b9" stroke-width="4"/>
  <text x="561" y="220" text-anchor="middle" font-family="Helvetica" font-size="56" font-weight="bold" fill="#2980b9">Certificate of Compliance</text>
  <text x="561" y="310" text-anchor="middle" font-family="Helvetica" font-size="28" fill="#000000">This certifies that</text>
  <text x="561" y="385" text-anchor="middle" font-family="Helvetica" font-size="42" font-weight="bold" fill="#000000">{facility}</text>
  <text x="561" y="455" text-anchor="middle" font-family="Helvetica" font-size="24" fill="#000000">has successfully completed the Scope 2 emissions self-assessment</text>
  <text x="561" y="500" text-anchor="middle" font-family="Helvetica" font-size="24" fill="#000000">Reported renewable energy share: {percentage:.2}%</text>
  <text x="561" y="545" text-anchor="middle" font-family="Helvetica" font-size="24" fill="#000000">Approved on: {approved_on}</text>
  <text x="561" y="660" text-anchor="middle" font-family="Helvetica" font-size="18" fill="#666666">Certificate ID: {certificate_id}</text>
  <text x="561" y="692" text-anchor="middle" font-family="Helvetica" font-size="18" fill="#666666">Verified by Sustally Application System</text>
</svg>
"##,
            facility = facility,
            percentage = input.renewable_percentage,
            approved_on = approved_on,
            certificate_id = certificate_id,
        );

        Certificate {
            bytes: markup.into_bytes(),
            content_type: "image/svg+xml",
            filename: "Certificate.svg",
        }
    }
}

fn xml_escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}
