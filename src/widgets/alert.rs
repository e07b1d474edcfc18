use hypertext::prelude::*;

pub struct ErrorAlert<S> {
    pub msg: S,
}

impl<S: ToString> Renderable for ErrorAlert<S> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        maud!({
            div class="alert alert-danger alert-dismissible" role="alert" {
                (self.msg.to_string())
            }
        })
        .render_to(buffer);
    }
}

pub struct SuccessAlert<S> {
    pub msg: S,
}

impl<S: ToString> Renderable for SuccessAlert<S> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        maud!({
            div class="alert alert-success" role="status" {
                (self.msg.to_string())
            }
        })
        .render_to(buffer);
    }
}
