// src/services/parser.rs

//! Page parsing.
//!
//! [`PageParser`] is the only place that knows the site's markup. The crawlers
//! hand it raw bodies and get references or detail records back.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{PostDetail, PostRef};
use crate::utils::resolve_url;

/// Turns fetched bodies into posts.
pub trait PageParser: Send + Sync {
    /// Number of listing pages announced by a category root page.
    fn parse_page_count(&self, body: &str) -> Option<usize>;

    /// Post references of a listing page, in document order (newest first).
    fn parse_listing(&self, body: &str, category: &str, listing_base: &str)
    -> Result<Vec<PostRef>>;

    /// Detail record of a post page.
    fn parse_detail(&self, body: &str, url: &str) -> Result<PostDetail>;
}

/// Marker every genuine post page carries in its `<title>`.
const POST_PAGE_MARKER: &str = "<title>欢迎访问武汉理工大学综合信息系统</title>";

/// Parser for the i.whut.edu.cn news portal.
pub struct WhutParser {
    count_pattern: Regex,
    info_pattern: Regex,
    list: Selector,
    list_link: Selector,
    title: Selector,
    info: Selector,
    text: Selector,
    image: Selector,
    file_box: Selector,
    anchor: Selector,
}

impl WhutParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            count_pattern: Self::parse_pattern(r"var countPage = (\d+)")?,
            info_pattern: Self::parse_pattern(r"发布：(.+?)\x{a0}\x{a0}时间：(.+?)\x{a0}")?,
            list: Self::parse_selector("ul.normal_list2")?,
            list_link: Self::parse_selector("li > span > a")?,
            title: Self::parse_selector("div.art_tit h2")?,
            info: Self::parse_selector("div.art_info")?,
            text: Self::parse_selector("div.art_text")?,
            image: Self::parse_selector("img")?,
            file_box: Self::parse_selector("div.file_box")?,
            anchor: Self::parse_selector("a")?,
        })
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }

    fn parse_pattern(s: &str) -> Result<Regex> {
        Regex::new(s).map_err(|e| AppError::config(format!("invalid pattern '{s}': {e}")))
    }

    fn first<'a>(
        document: &'a Html,
        selector: &Selector,
        url: &str,
        what: &str,
    ) -> Result<ElementRef<'a>> {
        document
            .select(selector)
            .next()
            .ok_or_else(|| AppError::parse(url, format!("missing {what}")))
    }
}

impl PageParser for WhutParser {
    fn parse_page_count(&self, body: &str) -> Option<usize> {
        self.count_pattern
            .captures(body)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    fn parse_listing(
        &self,
        body: &str,
        category: &str,
        listing_base: &str,
    ) -> Result<Vec<PostRef>> {
        let base = Url::parse(listing_base)?;
        let document = Html::parse_document(body);
        let list = Self::first(&document, &self.list, listing_base, "post list")?;

        Ok(list
            .select(&self.list_link)
            .filter_map(|link| {
                let href = link.value().attr("href")?;
                let title: String = link.text().collect();
                Some(PostRef::new(category, resolve_url(&base, href), title))
            })
            .collect())
    }

    fn parse_detail(&self, body: &str, url: &str) -> Result<PostDetail> {
        if !body.contains(POST_PAGE_MARKER) {
            return Err(AppError::parse(url, "not a post page"));
        }

        let base = Url::parse(url)?;
        let document = Html::parse_document(body);

        let title: String = Self::first(&document, &self.title, url, "title")?
            .text()
            .collect();

        let info: String = Self::first(&document, &self.info, url, "author line")?
            .text()
            .collect();
        let caps = self
            .info_pattern
            .captures(&info)
            .ok_or_else(|| AppError::parse(url, "author line has no author/date"))?;
        let author = caps[1].to_string();
        let date = caps[2].to_string();

        let text = Self::first(&document, &self.text, url, "body")?;
        let content: String = text.text().collect();
        let images = text
            .select(&self.image)
            .filter_map(|img| img.value().attr("src"))
            .map(str::to_string)
            .collect();

        // Posts without attachments may omit the file box entirely.
        let files = document
            .select(&self.file_box)
            .next()
            .map(|file_box| {
                file_box
                    .select(&self.anchor)
                    .filter_map(|a| a.value().attr("href"))
                    .map(|href| resolve_url(&base, href))
                    .collect()
            })
            .unwrap_or_default();

        Ok(PostDetail {
            url: url.to_string(),
            title,
            author,
            date,
            content,
            images,
            files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{detail_page, listing_page};

    fn parser() -> WhutParser {
        WhutParser::new().unwrap()
    }

    #[test]
    fn test_parse_page_count() {
        let body = listing_page(Some(12), &[]);
        assert_eq!(parser().parse_page_count(&body), Some(12));
        assert_eq!(parser().parse_page_count("<html></html>"), None);
    }

    #[test]
    fn test_parse_listing_keeps_document_order() {
        let body = listing_page(
            Some(1),
            &[
                ("./202401/t3.shtml", "Third"),
                ("../bmxw/202312/t2.shtml", "Second"),
                ("http://mp.weixin.qq.com/s/x", "External"),
            ],
        );
        let refs = parser()
            .parse_listing(&body, "xxtg", "http://i.whut.edu.cn/xxtg/")
            .unwrap();

        let urls: Vec<_> = refs.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "http://i.whut.edu.cn/xxtg/202401/t3.shtml",
                "http://i.whut.edu.cn/bmxw/202312/t2.shtml",
                "http://mp.weixin.qq.com/s/x",
            ]
        );
        assert_eq!(refs[0].title, "Third");
        assert!(refs.iter().all(|r| r.category == "xxtg"));
    }

    #[test]
    fn test_parse_listing_without_list_is_parse_failure() {
        let err = parser()
            .parse_listing("<html><body></body></html>", "xxtg", "http://i.whut.edu.cn/xxtg/")
            .unwrap_err();
        assert!(err.is_item_loss());
    }

    #[test]
    fn test_parse_detail() {
        let body = detail_page(
            "关于开学的通知",
            "教务处",
            "2024-02-20",
            "正文内容",
            &["/xxtg/202402/P1.pdf", "P2.docx"],
        );
        let detail = parser()
            .parse_detail(&body, "http://i.whut.edu.cn/xxtg/202402/t1.shtml")
            .unwrap();

        assert_eq!(detail.title, "关于开学的通知");
        assert_eq!(detail.author, "教务处");
        assert_eq!(detail.date, "2024-02-20");
        assert_eq!(detail.content, "正文内容");
        assert_eq!(detail.images, vec!["/images/a.png"]);
        assert_eq!(
            detail.files,
            vec![
                "http://i.whut.edu.cn/xxtg/202402/P1.pdf",
                "http://i.whut.edu.cn/xxtg/202402/P2.docx",
            ]
        );
    }

    #[test]
    fn test_parse_detail_rejects_foreign_page() {
        let err = parser()
            .parse_detail("<html><title>Login</title></html>", "http://i.whut.edu.cn/x.shtml")
            .unwrap_err();
        assert!(matches!(err, AppError::Parse { .. }));
    }

    #[test]
    fn test_parse_detail_requires_author_line() {
        let body = detail_page("t", "a", "d", "b", &[]).replace("发布：", "");
        assert!(
            parser()
                .parse_detail(&body, "http://i.whut.edu.cn/x.shtml")
                .is_err()
        );
    }

    #[test]
    fn test_parse_detail_without_file_box() {
        let body = detail_page("t", "a", "2024-01-01", "b", &[])
            .replace("<div class=\"file_box\"><ul></ul></div>", "");
        let detail = parser()
            .parse_detail(&body, "http://i.whut.edu.cn/x.shtml")
            .unwrap();
        assert!(detail.files.is_empty());
    }
}
