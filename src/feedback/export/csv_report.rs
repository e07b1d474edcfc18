use crate::feedback::{
    Feedback,
    export::{CustomColumns, DATE_FORMAT, ExportError, custom_section_cell},
    form_schema::{FormSchema, KnownField, KnownSection},
};

fn fixed_header(schema: &FormSchema) -> Vec<String> {
    let mut header = vec!["Submitted At".to_string()];
    header.extend(KnownField::ALL.map(|f| f.default_label().to_string()));
    for section in KnownSection::ALL {
        let label = schema
            .section(section.key())
            .map(|s| s.label.as_str())
            .unwrap_or(section.default_label());
        header.push(format!("{label} Rating"));
        header.push(format!("{label} Comments"));
    }
    header.push("Suggestions".to_string());
    header
}

/// One row per record with a fixed block of columns, followed by a column for
/// every custom field and then every custom section found in any record.
/// Cells a record has no answer for are left blank.
pub fn to_csv(records: &[Feedback], schema: &FormSchema) -> Result<String, ExportError> {
    let columns = CustomColumns::of_records(records);

    let mut header = fixed_header(schema);
    header.extend(
        columns
            .fields
            .iter()
            .map(|key| schema.field_label(key).to_string()),
    );
    header.extend(
        columns
            .sections
            .iter()
            .map(|key| schema.section_label(key).to_string()),
    );

    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(&header)?;

    for record in records {
        let mut row = vec![record.created_at.format(DATE_FORMAT).to_string()];
        row.extend(
            KnownField::ALL.map(|f| record.field(f).unwrap_or("").to_string()),
        );
        for section in KnownSection::ALL {
            row.push(
                record
                    .rating(section)
                    .map(|r| r.to_string())
                    .unwrap_or_default(),
            );
            row.push(record.comments(section).unwrap_or("").to_string());
        }
        row.push(record.suggestions.clone().unwrap_or_default());

        let custom = record.custom_data().unwrap_or_default();
        for key in &columns.fields {
            row.push(custom.fields.get(key).cloned().unwrap_or_default());
        }
        for key in &columns.sections {
            row.push(
                custom
                    .sections
                    .get(key)
                    .map(custom_section_cell)
                    .unwrap_or_default(),
            );
        }

        writer.write_record(&row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::CsvFlush(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::CsvFlush(e.to_string()))
}
