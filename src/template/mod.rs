//! Templating code.
//!
//! This defines the [`Page`] item, which every HTML response is wrapped in.

use hypertext::prelude::*;

use crate::auth::User;

pub struct Page<R: Renderable, const TX: bool> {
    body: Option<R>,
    user: Option<User<TX>>,
    title: Option<String>,
    site_name: Option<String>,
}

impl<R: Renderable, const TX: bool> Page<R, TX> {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn body(mut self, body: R) -> Self {
        self.body = Some(body);
        self
    }

    pub fn user(mut self, user: User<TX>) -> Self {
        self.user = Some(user);
        self
    }

    pub fn user_opt(mut self, user: Option<User<TX>>) -> Self {
        self.user = user;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn site_name(mut self, site_name: impl Into<String>) -> Self {
        self.site_name = Some(site_name.into());
        self
    }
}

impl<R: Renderable, const TX: bool> Renderable for Page<R, TX> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let site_name = self.site_name.as_deref().unwrap_or("Conference");
        let page_title = match &self.title {
            Some(title) => format!("{title} | {site_name}"),
            None => site_name.to_string(),
        };

        maud! {
            html {
                head {
                    title { (page_title) }
                    meta charset="utf-8";
                    meta
                        name="viewport"
                        content="width=device-width, initial-scale=1";
                    link
                        href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/css/bootstrap.min.css"
                        rel="stylesheet"
                        crossorigin="anonymous";
                }
                body class="d-flex flex-column vh-100" {
                    nav class="navbar navbar-expand"
                        style="background-color: #452859;"
                        data-bs-theme="dark" {
                        div class="container-fluid" {
                            a class="navbar-brand text-white" href="/" {
                                (site_name)
                            }
                            ul class="navbar-nav me-auto" {
                                li class="nav-item" {
                                    a class="nav-link text-white" href="/feedback" { "Feedback" }
                                }
                                li class="nav-item" {
                                    a class="nav-link text-white" href="/results" { "Results" }
                                }
                                @if self.user.is_some() {
                                    li class="nav-item" {
                                        a class="nav-link text-white" href="/admin/feedback" { "Dashboard" }
                                    }
                                    li class="nav-item" {
                                        a class="nav-link text-white" href="/admin/feedback/form" { "Form" }
                                    }
                                    li class="nav-item" {
                                        a class="nav-link text-white" href="/admin/feedback/access" { "Access code" }
                                    }
                                }
                            }
                            ul class="navbar-nav" {
                                @if let Some(user) = &self.user {
                                    li class="nav-item" {
                                        span class="navbar-text text-white me-3" {
                                            (user.username)
                                        }
                                    }
                                    li class="nav-item" {
                                        form method="post" action="/logout" {
                                            button type="submit" class="btn btn-sm btn-outline-light" {
                                                "Log out"
                                            }
                                        }
                                    }
                                } @else {
                                    li class="nav-item" {
                                        a class="nav-link text-white" href="/login" {
                                            "Login"
                                        }
                                    }
                                }
                            }
                        }
                    }
                    div class="flex-grow-1 container py-4" {
                        @if let Some(body) = &self.body {
                            (body)
                        }
                    }
                }
            }
        }.render_to(buffer)
    }
}

impl<R: Renderable, const TX: bool> Default for Page<R, TX> {
    fn default() -> Self {
        Self {
            body: Default::default(),
            user: Default::default(),
            title: Default::default(),
            site_name: Default::default(),
        }
    }
}
