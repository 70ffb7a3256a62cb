// src/utils/url.rs

//! Site URL layout: listing pages, post eligibility, attachment names.

use crate::models::SiteConfig;

/// URL of listing page `page` of a category.
///
/// Page 0 is the category root; later pages are `index_{n}.shtml` under it.
///
/// # Examples
/// ```
/// use harvester::utils::url::page_url;
///
/// assert_eq!(page_url("http://i.whut.edu.cn", "xxtg", 0), "http://i.whut.edu.cn/xxtg");
/// assert_eq!(
///     page_url("http://i.whut.edu.cn", "xxtg", 2),
///     "http://i.whut.edu.cn/xxtg/index_2.shtml"
/// );
/// ```
pub fn page_url(base_url: &str, category: &str, page: usize) -> String {
    let root = format!("{}/{}", base_url.trim_end_matches('/'), category);
    if page == 0 {
        root
    } else {
        format!("{root}/index_{page}.shtml")
    }
}

/// Base that listing links of a category are resolved against.
pub fn listing_base(base_url: &str, category: &str) -> String {
    format!("{}/{}/", base_url.trim_end_matches('/'), category)
}

/// Whether a post URL belongs to the site and looks like a post page.
pub fn is_eligible_post(site: &SiteConfig, url: &str) -> bool {
    url.starts_with(site.base()) && url.ends_with(&site.post_suffix)
}

/// Local file name for a downloaded attachment.
///
/// The base URL prefix is stripped and remaining slashes become underscores.
pub fn attachment_file_name(base_url: &str, url: &str) -> String {
    let prefix = format!("{}/", base_url.trim_end_matches('/'));
    url.strip_prefix(&prefix)
        .unwrap_or(url)
        .replace('/', "_")
}
