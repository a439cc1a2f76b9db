use axum::http::{header::ACCEPT_LANGUAGE, HeaderMap};

/// Language of the caller-facing relay messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    /// Primary product locale.
    #[default]
    Arabic,
    English,
}

impl Locale {
    /// Picks the locale from the first `Accept-Language` entry: English for
    /// any `en` tag, Arabic otherwise.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let primary = headers
            .get(ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|tag| tag.trim().to_ascii_lowercase())
            .unwrap_or_default();

        if primary == "en" || primary.starts_with("en-") || primary.starts_with("en;") {
            Locale::English
        } else {
            Locale::Arabic
        }
    }

    pub fn saved_leads(&self, saved_count: u64) -> String {
        match self {
            Locale::Arabic => format!("تم حفظ {} نتيجة بنجاح في قائمة العملاء", saved_count),
            Locale::English => format!("Saved {} results to your leads list", saved_count),
        }
    }

    /// Delivery gave up and the last response was a 4xx.
    pub fn input_needs_correction(&self) -> &'static str {
        match self {
            Locale::Arabic => "خطأ في البيانات المرسلة. يرجى المحاولة مرة أخرى.",
            Locale::English => "The search data was rejected. Please check it and try again.",
        }
    }

    pub fn temporary_delivery_problem(&self) -> &'static str {
        match self {
            Locale::Arabic => "واجهنا مشكلة مؤقتة في الإرسال. سنحاول مرة أخرى.",
            Locale::English => "We hit a temporary problem sending your search. Please retry later.",
        }
    }

    pub fn unexpected_error(&self) -> &'static str {
        match self {
            Locale::Arabic => "حدث خطأ غير متوقع. يرجى المحاولة لاحقاً.",
            Locale::English => "An unexpected error occurred. Please try again later.",
        }
    }

    pub fn search_in_progress(&self) -> &'static str {
        match self {
            Locale::Arabic => "هذا البحث قيد التنفيذ بالفعل. يرجى الانتظار حتى يكتمل.",
            Locale::English => "This search is already running. Please wait for it to finish.",
        }
    }
}
