use askama::Template; // bring trait in scope

#[derive(Template)]
#[template(path = "section.html")]
pub struct SectionHtml<'a> {
    pub title: &'a str,
    pub body: &'a str,
}
