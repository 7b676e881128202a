//! Image galleries: a `*.gallery` file describes a set of images, from which
//! gallery pages (a fixed number of images each), one page per image and,
//! for multi-page galleries, a main page are generated.
//!
//! ```toml
//! title = "Holidays"
//! images_per_page = 12
//!
//! [main_page]
//! template = "wide.template"
//!
//! [image."images/beach.jpg"]
//! title = "At the beach"
//! description = "Sunset."
//! sort_info = 1
//! ```

use rustc_hash::FxHashMap;
use serde::Deserialize;

use kestrel::value::{Dict, Format, Value, SortInfo, Title, MetaKey};
use kestrel::error::Result;

use crate::config::GalleryDefaults;
use crate::util::escaped;

/// The contents of a `*.gallery` file. Unset fields take the site defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Gallery {
    pub title: Option<String>,
    pub images_per_page: Option<usize>,
    pub images: Option<String>,
    pub extensions: Option<Vec<String>>,
    pub sort_info: Option<i64>,
    /// Meta info for the main page.
    pub main_page: Dict,
    /// Meta info for every gallery page.
    pub gallery_pages: Dict,
    /// Meta info for every image page.
    pub image_pages: Dict,
    /// Meta info by image path, relative to the gallery file.
    pub image: FxHashMap<String, Dict>,
}

/// A page to add to the tree, next to the gallery file.
#[derive(Debug, Clone)]
pub struct GeneratedPage {
    pub name: String,
    pub meta: Dict,
    pub content: String,
}

struct Image<'a> {
    path: &'a str,
    title: String,
    meta: Dict,
    page: String,
}

impl Gallery {
    pub fn parse(source: &str) -> Result<Self> {
        Ok(kestrel::value::Toml::from_str(source)?)
    }

    pub fn title<'a>(&'a self, defaults: &'a GalleryDefaults) -> &'a str {
        self.title.as_deref().unwrap_or(&defaults.title)
    }

    /// The directory images are listed from, relative to the gallery file.
    pub fn images_dir<'a>(&'a self, defaults: &'a GalleryDefaults) -> &'a str {
        self.images.as_deref().unwrap_or(&defaults.images)
    }

    /// Whether `path` names an image of this gallery.
    pub fn is_image(&self, defaults: &GalleryDefaults, path: &str) -> bool {
        let extensions = self.extensions.as_ref().unwrap_or(&defaults.extensions);
        path.rsplit_once('.')
            .map_or(false, |(_, ext)| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    /// Plans the pages for `images`, paths relative to the gallery file.
    /// Images are ordered by their `sort_info`, then by title.
    pub fn pages(&self, defaults: &GalleryDefaults, images: &[String]) -> Vec<GeneratedPage> {
        let title = self.title(defaults);
        let per_page = self.images_per_page.unwrap_or(defaults.images_per_page).max(1);
        let sort_info = self.sort_info.unwrap_or(defaults.sort_info);

        let mut images: Vec<Image<'_>> = images.iter()
            .filter(|path| self.is_image(defaults, path))
            .map(|path| self.image(title, path))
            .collect();

        images.sort_by(|a, b| {
            let order = |i: &Image<'_>| i.meta.get(SortInfo::KEY).and_then(Value::to_int).unwrap_or(0);
            order(a).cmp(&order(b)).then_with(|| a.title.cmp(&b.title))
        });

        let chunks: Vec<&[Image<'_>]> = images.chunks(per_page).collect();
        let mut galleries: Vec<GeneratedPage> = chunks.iter()
            .enumerate()
            .map(|(i, chunk)| {
                let number = i + 1;
                let page_title = format!("{title} {number}");
                let mut meta = self.gallery_pages.clone();
                meta.insert(Title::KEY.into(), page_title.clone().into());
                meta.insert(SortInfo::KEY.into(), (sort_info + number as i64).into());
                meta.insert("gallery_number".into(), number.into());
                meta.insert("images".into(), chunk.iter().map(Image::to_value).collect());
                GeneratedPage { name: file_name(&page_title), meta, content: String::new() }
            })
            .collect();

        let names: Vec<String> = galleries.iter().map(|g| g.name.clone()).collect();
        for (i, gallery) in galleries.iter_mut().enumerate() {
            let previous = i.checked_sub(1).and_then(|i| names.get(i));
            gallery.content = gallery_html(chunks[i], previous, names.get(i + 1));
        }

        let mut pages = vec![];
        if galleries.len() == 1 {
            let gallery = &mut galleries[0];
            gallery.meta.insert(Title::KEY.into(), title.into());
            gallery.meta.extend(self.main_page.clone());
        } else {
            let list = galleries.iter().map(|g| {
                let mut dict: Dict = Dict::new();
                dict.insert(Title::KEY.into(), g.meta.get(Title::KEY).cloned().unwrap_or(Value::Null));
                dict.insert("page".into(), g.name.as_str().into());
                Value::from(dict)
            });

            let mut meta = Dict::new();
            meta.insert("galleries".into(), list.collect());
            meta.insert(Title::KEY.into(), title.into());
            meta.insert(SortInfo::KEY.into(), sort_info.into());
            meta.extend(self.main_page.clone());
            let content = main_html(&galleries);
            pages.push(GeneratedPage { name: file_name(title), meta, content });
        }

        for (i, chunk) in chunks.iter().enumerate() {
            let gallery = &galleries[i].name;
            for (j, image) in chunk.iter().enumerate() {
                let previous = j.checked_sub(1).map(|j| &chunk[j].page);
                let next = chunk.get(j + 1).map(|image| &image.page);
                let mut meta = image.meta.clone();
                meta.insert("image".into(), image.path.into());
                meta.insert("gallery".into(), gallery.as_str().into());
                pages.push(GeneratedPage {
                    name: image.page.clone(),
                    meta,
                    content: image_html(image, gallery, previous, next),
                });
            }
        }

        galleries.extend(pages);
        galleries
    }

    fn image<'a>(&self, title: &str, path: &'a str) -> Image<'a> {
        let basename = path.rsplit('/').next().unwrap_or(path);
        let mut meta = self.image_pages.clone();
        meta.extend(self.image.get(path).cloned().unwrap_or_default());

        let image_title = match meta.get(Title::KEY).and_then(|v| v.as_str()) {
            Some(title) => title.to_string(),
            None => format!("Image {basename}"),
        };

        meta.insert(Title::KEY.into(), image_title.as_str().into());
        meta.entry("description".into()).or_insert_with(|| "".into());
        Image {
            path,
            title: image_title,
            meta,
            page: file_name(&format!("{title} {basename}")),
        }
    }
}

impl Image<'_> {
    fn to_value(&self) -> Value {
        let mut dict: Dict = Dict::new();
        dict.insert(Title::KEY.into(), self.title.as_str().into());
        dict.insert("image".into(), self.path.into());
        dict.insert("page".into(), self.page.as_str().into());
        dict.into()
    }
}

/// `title` with spaces and dots replaced by underscores, as an HTML file
/// name.
fn file_name(title: &str) -> String {
    format!("{}.html", title.replace([' ', '.'], "_"))
}

fn nav(previous: Option<&String>, up: Option<&str>, next: Option<&String>) -> String {
    let mut html = String::from("<nav class=\"gallery-nav\">");
    if let Some(previous) = previous {
        html.push_str(&format!("<a rel=\"prev\" href=\"{}\">previous</a>", escaped(previous)));
    }

    if let Some(up) = up {
        html.push_str(&format!("<a rel=\"up\" href=\"{}\">gallery</a>", escaped(up)));
    }

    if let Some(next) = next {
        html.push_str(&format!("<a rel=\"next\" href=\"{}\">next</a>", escaped(next)));
    }

    html.push_str("</nav>");
    html
}

fn gallery_html(images: &[Image<'_>], previous: Option<&String>, next: Option<&String>) -> String {
    let mut html = String::from("<div class=\"gallery\">\n");
    for image in images {
        html.push_str(&format!(
            "<a href=\"{}\"><img src=\"{}\" alt=\"{}\"/></a>\n",
            escaped(&image.page),
            escaped(image.path),
            escaped(&image.title),
        ));
    }

    html.push_str("</div>\n");
    html.push_str(&nav(previous, None, next));
    html
}

fn image_html(image: &Image<'_>, gallery: &str, previous: Option<&String>, next: Option<&String>) -> String {
    let description = image.meta.get("description").and_then(|v| v.as_str()).unwrap_or("");
    format!(
        "<figure><img src=\"{}\" alt=\"{}\"/><figcaption>{}</figcaption></figure>\n{}",
        escaped(image.path),
        escaped(&image.title),
        escaped(description),
        nav(previous, Some(gallery), next),
    )
}

fn main_html(galleries: &[GeneratedPage]) -> String {
    let mut html = String::from("<ul class=\"galleries\">\n");
    for gallery in galleries {
        let title = gallery.meta.get(Title::KEY).and_then(|v| v.as_str()).unwrap_or(&gallery.name);
        html.push_str(&format!(
            "<li><a href=\"{}\">{}</a></li>\n",
            escaped(&gallery.name),
            escaped(title),
        ));
    }

    html.push_str("</ul>");
    html
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn images(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("images/img{i:02}.jpg")).collect()
    }

    #[test]
    fn single_page_gallery() {
        let defaults = GalleryDefaults::default();
        let gallery = Gallery::parse("title = 'Trip'\n[image.'images/img02.jpg']\nsort_info = -1\ntitle = 'First'").unwrap();
        let pages = gallery.pages(&defaults, &images(3));

        let names: Vec<_> = pages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Trip_1.html", "Trip_img02_jpg.html", "Trip_img01_jpg.html", "Trip_img03_jpg.html"]);
        assert_eq!(pages[0].meta[Title::KEY], Value::from("Trip"));
        assert_eq!(pages[1].meta[Title::KEY], Value::from("First"));
        assert_eq!(pages[2].meta[Title::KEY], Value::from("Image img01.jpg"));
        assert_eq!(pages[0].meta["images"].as_slice().map(|i| i.len()), Some(3));
        assert!(pages[0].content.contains("<img src=\"images/img02.jpg\" alt=\"First\"/>"));
        assert!(pages[2].content.contains("rel=\"prev\" href=\"Trip_img02_jpg.html\""));
        assert!(pages[2].content.contains("rel=\"up\" href=\"Trip_1.html\""));
    }

    #[test]
    fn paged_gallery_has_a_main_page() {
        let defaults = GalleryDefaults::default();
        let mut files = images(5);
        files.push("images/notes.txt".into());

        let gallery = Gallery::parse("images_per_page = 2\n[main_page]\ntemplate = 'wide.template'").unwrap();
        let pages = gallery.pages(&defaults, &files);
        let names: Vec<_> = pages.iter().take(4).map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Gallery_1.html", "Gallery_2.html", "Gallery_3.html", "Gallery.html"]);
        assert_eq!(pages.len(), 4 + 5);

        let main = &pages[3];
        assert_eq!(main.meta["template"], Value::from("wide.template"));
        assert_eq!(main.meta[SortInfo::KEY], Value::from(50));
        assert!(main.content.contains("<a href=\"Gallery_2.html\">Gallery 2</a>"));

        assert_eq!(pages[1].meta[SortInfo::KEY], Value::from(52));
        assert!(pages[1].content.contains("rel=\"prev\" href=\"Gallery_1.html\""));
        assert!(pages[1].content.contains("rel=\"next\" href=\"Gallery_3.html\""));
        assert!(!pages[0].content.contains("rel=\"prev\""));
    }

    #[test]
    fn invalid_gallery_file() {
        assert!(Gallery::parse("images_per_page = 'many'").is_err());
    }
}
