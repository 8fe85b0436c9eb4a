use crate::reports::Report;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// Catalog entry returned by `GET /api/reports`.
#[derive(Debug, Serialize)]
pub struct ReportInfo {
    pub name: &'static str,
    pub description: &'static str,
}

impl From<Report> for ReportInfo {
    fn from(report: Report) -> Self {
        Self {
            name: report.name(),
            description: report.description(),
        }
    }
}
