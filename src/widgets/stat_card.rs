use hypertext::prelude::*;

use crate::feedback::{
    aggregate::SectionAverages,
    form_schema::{FormSchema, KnownSection},
};

/// The headline numbers: response count and the average of each default
/// section. The admin dashboard and the public results page both use this.
pub struct StatCard<'a> {
    pub averages: &'a SectionAverages,
    pub responses: usize,
    pub schema: &'a FormSchema,
}

impl StatCard<'_> {
    fn label(&self, section: KnownSection) -> &str {
        self.schema
            .section(section.key())
            .map(|s| s.label.as_str())
            .unwrap_or(section.default_label())
    }
}

impl Renderable for StatCard<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        maud! {
            div class="row row-cols-2 row-cols-md-3 row-cols-lg-6 g-3 mb-4" {
                div class="col" {
                    div class="card text-center h-100" {
                        div class="card-body" {
                            h6 class="card-subtitle text-muted mb-2" { "Responses" }
                            p class="card-text fs-3 mb-0" { (self.responses.to_string()) }
                        }
                    }
                }
                @for (section, mean) in self.averages.iter() {
                    div class="col" {
                        div class="card text-center h-100" {
                            div class="card-body" {
                                h6 class="card-subtitle text-muted mb-2" { (self.label(section)) }
                                p class="card-text fs-3 mb-0" {
                                    (mean.round_dp(2).to_string())
                                }
                            }
                        }
                    }
                }
            }
        }
        .render_to(buffer);
    }
}
