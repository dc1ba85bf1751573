// src/store/index.rs
//
// Derived in-memory index over post records.
//
// RULES:
// - Never a source of truth: always rebuildable from the persisted records
// - Updated in the same critical section as the record write it mirrors

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::domain::query::compare_keys;
use crate::domain::{Platform, PostId, PostQuery, PostRecord, PostStatus, QueryKey};

#[derive(Debug, Default)]
pub struct PostIndex {
    keys: HashMap<PostId, QueryKey>,
    by_status: HashMap<PostStatus, BTreeSet<PostId>>,
    by_platform: HashMap<Platform, BTreeSet<PostId>>,
    by_author: BTreeMap<String, BTreeSet<PostId>>,
    by_tag: BTreeMap<String, BTreeSet<PostId>>,
}

impl PostIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rebuild<'a, I>(posts: I) -> Self
    where
        I: IntoIterator<Item = &'a PostRecord>,
    {
        let mut index = Self::new();
        for post in posts {
            index.insert(post);
        }
        index
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, id: &PostId) -> bool {
        self.keys.contains_key(id)
    }

    pub fn get(&self, id: &PostId) -> Option<&QueryKey> {
        self.keys.get(id)
    }

    /// Insert or replace the entry for `post`
    pub fn insert(&mut self, post: &PostRecord) {
        self.remove(&post.id);

        let key = QueryKey::from(post);
        let id = key.id.clone();

        self.by_status.entry(key.status).or_default().insert(id.clone());
        self.by_platform.entry(key.platform).or_default().insert(id.clone());
        if let Some(author) = &key.author {
            self.by_author.entry(author.clone()).or_default().insert(id.clone());
        }
        for tag in &key.tags {
            self.by_tag.entry(tag.clone()).or_default().insert(id.clone());
        }

        self.keys.insert(id, key);
    }

    pub fn remove(&mut self, id: &PostId) -> bool {
        let Some(key) = self.keys.remove(id) else {
            return false;
        };

        if let Some(set) = self.by_status.get_mut(&key.status) {
            set.remove(id);
        }
        if let Some(set) = self.by_platform.get_mut(&key.platform) {
            set.remove(id);
        }
        if let Some(author) = &key.author {
            remove_from(&mut self.by_author, author, id);
        }
        for tag in &key.tags {
            remove_from(&mut self.by_tag, tag, id);
        }
        true
    }

    /// Filter, sort and paginate. Returns the page of ids plus the full match count.
    pub fn query(&self, query: &PostQuery) -> (Vec<PostId>, usize) {
        let mut matched: Vec<&QueryKey> = self
            .candidates(query)
            .into_iter()
            .filter_map(|id| self.keys.get(id))
            .filter(|key| key.matches(query))
            .collect();

        let total = matched.len();
        matched.sort_by(|a, b| compare_keys(a, b, query.sort_by, query.sort_desc));

        let page = matched
            .into_iter()
            .skip(query.offset)
            .take(query.effective_limit())
            .map(|key| key.id.clone())
            .collect();

        (page, total)
    }

    /// Ids whose entry satisfies `predicate`, in id order
    pub fn select<F>(&self, predicate: F) -> Vec<PostId>
    where
        F: Fn(&QueryKey) -> bool,
    {
        let mut ids: Vec<PostId> = self
            .keys
            .values()
            .filter(|key| predicate(key))
            .map(|key| key.id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn authors(&self) -> Vec<String> {
        self.by_author.keys().cloned().collect()
    }

    pub fn tags(&self) -> Vec<String> {
        self.by_tag.keys().cloned().collect()
    }

    pub fn platforms(&self) -> Vec<Platform> {
        let mut platforms: Vec<Platform> = self
            .by_platform
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(p, _)| *p)
            .collect();
        platforms.sort();
        platforms
    }

    pub fn statuses(&self) -> Vec<PostStatus> {
        let mut statuses: Vec<PostStatus> = self
            .by_status
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(s, _)| *s)
            .collect();
        statuses.sort();
        statuses
    }

    /// Narrowest secondary-index set for the query, or every id
    fn candidates(&self, query: &PostQuery) -> Vec<&PostId> {
        let mut sets: Vec<BTreeSet<&PostId>> = Vec::new();

        if !query.statuses.is_empty() {
            sets.push(union(query.statuses.iter().filter_map(|s| self.by_status.get(s))));
        }
        if !query.platforms.is_empty() {
            sets.push(union(query.platforms.iter().filter_map(|p| self.by_platform.get(p))));
        }
        if !query.authors.is_empty() {
            sets.push(union(query.authors.iter().filter_map(|a| self.by_author.get(a))));
        }
        if let Some(tag) = query.tag.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            sets.push(union(self.by_tag.get(tag)));
        }

        match sets.into_iter().min_by_key(|s| s.len()) {
            Some(narrowest) => narrowest.into_iter().collect(),
            None => self.keys.keys().collect(),
        }
    }
}

fn union<'a, I>(sets: I) -> BTreeSet<&'a PostId>
where
    I: IntoIterator<Item = &'a BTreeSet<PostId>>,
{
    sets.into_iter().flatten().collect()
}

fn remove_from(map: &mut BTreeMap<String, BTreeSet<PostId>>, key: &str, id: &PostId) {
    if let Some(set) = map.get_mut(key) {
        set.remove(id);
        if set.is_empty() {
            map.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{normalize, SortField};

    fn post(code: &str, status: PostStatus, likes: Option<u64>) -> PostRecord {
        let url = format!("https://instagram.com/p/{}", code);
        let mut post = PostRecord::stub(&url, &normalize(&url), "a.md", None);
        post.status = status;
        post.likes = likes;
        post
    }

    #[test]
    fn test_query_sorts_and_paginates_with_full_total() {
        let posts: Vec<PostRecord> = [10, 50, 5, 100, 20]
            .iter()
            .enumerate()
            .map(|(i, likes)| post(&format!("L{}", i), PostStatus::Accessible, Some(*likes)))
            .collect();
        let index = PostIndex::rebuild(&posts);

        let query = PostQuery {
            statuses: vec![PostStatus::Accessible],
            sort_by: SortField::Likes,
            sort_desc: true,
            limit: 2,
            offset: 0,
            ..Default::default()
        };
        let (page, total) = index.query(&query);

        assert_eq!(total, 5);
        assert_eq!(page, vec![posts[3].id.clone(), posts[1].id.clone()]);
    }

    #[test]
    fn test_reinsert_moves_secondary_entries() {
        let mut p = post("MOVE", PostStatus::Pending, None);
        let mut index = PostIndex::new();
        index.insert(&p);

        p.status = PostStatus::Accessible;
        p.author = Some("amy".to_string());
        p.add_tag("keep");
        index.insert(&p);

        assert_eq!(index.len(), 1);
        assert_eq!(index.statuses(), vec![PostStatus::Accessible]);
        assert_eq!(index.authors(), vec!["amy".to_string()]);

        let pending = PostQuery {
            statuses: vec![PostStatus::Pending],
            ..Default::default()
        };
        assert_eq!(index.query(&pending).1, 0);
    }

    #[test]
    fn test_remove_clears_vocabulary() {
        let mut p = post("GONE", PostStatus::Accessible, None);
        p.add_tag("solo");
        let mut index = PostIndex::rebuild([&p]);

        assert!(index.remove(&p.id));
        assert!(!index.remove(&p.id));
        assert!(index.tags().is_empty());
        assert!(index.is_empty());
    }

    #[test]
    fn test_offset_past_end_keeps_total() {
        let posts = vec![post("A", PostStatus::Pending, None)];
        let index = PostIndex::rebuild(&posts);
        let (page, total) = index.query(&PostQuery {
            offset: 10,
            ..Default::default()
        });
        assert!(page.is_empty());
        assert_eq!(total, 1);
    }
}
