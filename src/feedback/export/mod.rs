//! Downloadable reports of submitted feedback.

pub mod csv_report;
pub mod pdf_report;

use std::collections::BTreeSet;

use crate::feedback::{CustomData, CustomSectionAnswer, Feedback};

#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error("could not write the CSV report: {0}")]
    Csv(#[from] csv::Error),
    #[error("could not finish the CSV report: {0}")]
    CsvFlush(String),
    #[error("could not render the PDF report: {0}")]
    Pdf(String),
}

/// The custom keys found across a set of records, each group sorted
/// alphabetically so that reports come out the same every time.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CustomColumns {
    pub fields: Vec<String>,
    pub sections: Vec<String>,
}

impl CustomColumns {
    pub fn discover<'a>(custom: impl IntoIterator<Item = &'a CustomData>) -> Self {
        let mut fields = BTreeSet::new();
        let mut sections = BTreeSet::new();
        for data in custom {
            fields.extend(data.fields.keys().cloned());
            sections.extend(data.sections.keys().cloned());
        }
        CustomColumns {
            fields: fields.into_iter().collect(),
            sections: sections.into_iter().collect(),
        }
    }

    pub fn of_records(records: &[Feedback]) -> Self {
        let decoded: Vec<CustomData> =
            records.iter().filter_map(Feedback::custom_data).collect();
        Self::discover(&decoded)
    }

    pub fn len(&self) -> usize {
        self.fields.len() + self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `"4"`, or `"4: comments"` when there are comments.
pub fn custom_section_cell(answer: &CustomSectionAnswer) -> String {
    let rating = answer.rating.map(|r| r.to_string()).unwrap_or_default();
    match answer.comments.as_deref() {
        Some(comments) if rating.is_empty() => comments.to_string(),
        Some(comments) => format!("{rating}: {comments}"),
        None => rating,
    }
}

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovered_keys_are_unioned_and_sorted() {
        let mut a = CustomData::default();
        a.fields.insert("field_b".into(), "1".into());
        a.sections.insert(
            "custom_z".into(),
            CustomSectionAnswer {
                rating: Some(2),
                comments: None,
            },
        );
        let mut b = CustomData::default();
        b.fields.insert("field_a".into(), "2".into());
        b.fields.insert("field_b".into(), "3".into());

        let columns = CustomColumns::discover([&a, &b]);
        assert_eq!(columns.fields, ["field_a", "field_b"]);
        assert_eq!(columns.sections, ["custom_z"]);
        assert_eq!(columns.len(), 3);
    }

    #[test]
    fn section_cells() {
        let cell = |rating, comments: Option<&str>| {
            custom_section_cell(&CustomSectionAnswer {
                rating,
                comments: comments.map(str::to_string),
            })
        };
        assert_eq!(cell(Some(4), None), "4");
        assert_eq!(cell(Some(4), Some("nice")), "4: nice");
        assert_eq!(cell(None, Some("nice")), "nice");
        assert_eq!(cell(None, None), "");
    }
}
