use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{BlogStore, PostFilter};
use crate::error::{AppError, Result};
use crate::models::{
    AuthorView, Comment, CommentView, Follow, Group, GroupRef, NewComment, NewGroup, NewPost,
    NewUser, Post, PostChanges, PostView, User,
};

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<i64, User>,
    groups: BTreeMap<i64, Group>,
    posts: BTreeMap<i64, Post>,
    comments: BTreeMap<i64, Comment>,
    follows: BTreeMap<i64, Follow>,
}

impl Tables {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn matches(&self, post: &Post, filter: PostFilter) -> bool {
        match filter {
            PostFilter::All => true,
            PostFilter::Group(group_id) => post.group_id == Some(group_id),
            PostFilter::Author(author_id) => post.author_id == author_id,
            PostFilter::FollowedBy(user_id) => self
                .follows
                .values()
                .any(|f| f.user_id == user_id && f.author_id == post.author_id),
        }
    }

    fn post_view(&self, post: &Post) -> Option<PostView> {
        let author = self.users.get(&post.author_id)?;
        let group = post
            .group_id
            .and_then(|id| self.groups.get(&id))
            .map(GroupRef::from);

        Some(PostView {
            id: post.id,
            text: post.text.clone(),
            pub_date: post.pub_date,
            author: AuthorView::from(author),
            group,
            image: post.image.clone(),
        })
    }

    /// Posts matching `filter`, newest first
    fn ordered_posts(&self, filter: PostFilter) -> Vec<&Post> {
        let mut posts: Vec<&Post> = self
            .posts
            .values()
            .filter(|post| self.matches(post, filter))
            .collect();
        posts.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        posts
    }

    fn remove_post_cascade(&mut self, post_id: i64) -> bool {
        let removed = self.posts.remove(&post_id).is_some();
        if removed {
            self.comments.retain(|_, c| c.post_id != Some(post_id));
        }
        removed
    }
}

/// Process-local store with the same constraints as the relational schema.
///
/// Used by `STORAGE_BACKEND=memory` and the test suite.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl BlogStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(AppError::Conflict(format!(
                "username '{}' is already taken",
                user.username
            )));
        }

        let id = tables.allocate_id();
        let created = User {
            id,
            username: user.username,
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            date_joined: Utc::now(),
        };
        tables.users.insert(id, created.clone());
        Ok(created)
    }

    async fn find_user(&self, user_id: i64) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&user_id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn delete_user(&self, user_id: i64) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&user_id).is_none() {
            return Ok(false);
        }

        let authored: Vec<i64> = tables
            .posts
            .values()
            .filter(|p| p.author_id == user_id)
            .map(|p| p.id)
            .collect();
        for post_id in authored {
            tables.remove_post_cascade(post_id);
        }
        tables.comments.retain(|_, c| c.author_id != user_id);
        tables
            .follows
            .retain(|_, f| f.user_id != user_id && f.author_id != user_id);
        Ok(true)
    }

    async fn create_group(&self, group: NewGroup) -> Result<Group> {
        let mut tables = self.tables.write().await;
        if tables.groups.values().any(|g| g.slug == group.slug) {
            return Err(AppError::Conflict(format!(
                "group slug '{}' is already taken",
                group.slug
            )));
        }

        let id = tables.allocate_id();
        let created = Group {
            id,
            title: group.title,
            slug: group.slug,
            description: group.description,
        };
        tables.groups.insert(id, created.clone());
        Ok(created)
    }

    async fn find_group(&self, group_id: i64) -> Result<Option<Group>> {
        Ok(self.tables.read().await.groups.get(&group_id).cloned())
    }

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<Group>> {
        let tables = self.tables.read().await;
        Ok(tables.groups.values().find(|g| g.slug == slug).cloned())
    }

    async fn list_groups(&self) -> Result<Vec<Group>> {
        let tables = self.tables.read().await;
        let mut groups: Vec<Group> = tables.groups.values().cloned().collect();
        groups.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(groups)
    }

    async fn delete_group(&self, group_id: i64) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.groups.remove(&group_id).is_none() {
            return Ok(false);
        }
        for post in tables.posts.values_mut() {
            if post.group_id == Some(group_id) {
                post.group_id = None;
            }
        }
        Ok(true)
    }

    async fn create_post(&self, post: NewPost) -> Result<Post> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&post.author_id) {
            return Err(AppError::DatabaseError(format!(
                "author {} does not exist",
                post.author_id
            )));
        }
        if let Some(group_id) = post.group_id {
            if !tables.groups.contains_key(&group_id) {
                return Err(AppError::DatabaseError(format!(
                    "group {} does not exist",
                    group_id
                )));
            }
        }

        let id = tables.allocate_id();
        let created = Post {
            id,
            text: post.text,
            pub_date: Utc::now(),
            author_id: post.author_id,
            group_id: post.group_id,
            image: post.image,
        };
        tables.posts.insert(id, created.clone());
        Ok(created)
    }

    async fn find_post(&self, post_id: i64) -> Result<Option<PostView>> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .get(&post_id)
            .and_then(|post| tables.post_view(post)))
    }

    async fn update_post(&self, post_id: i64, changes: PostChanges) -> Result<Option<Post>> {
        let mut tables = self.tables.write().await;
        if let Some(group_id) = changes.group_id {
            if !tables.groups.contains_key(&group_id) {
                return Err(AppError::DatabaseError(format!(
                    "group {} does not exist",
                    group_id
                )));
            }
        }

        let Some(post) = tables.posts.get_mut(&post_id) else {
            return Ok(None);
        };
        post.text = changes.text;
        post.group_id = changes.group_id;
        if let Some(image) = changes.image {
            post.image = image;
        }
        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, post_id: i64) -> Result<bool> {
        Ok(self.tables.write().await.remove_post_cascade(post_id))
    }

    async fn count_posts(&self, filter: PostFilter) -> Result<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .values()
            .filter(|post| tables.matches(post, filter))
            .count() as i64)
    }

    async fn list_posts(
        &self,
        filter: PostFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<PostView>> {
        let tables = self.tables.read().await;
        Ok(tables
            .ordered_posts(filter)
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .filter_map(|post| tables.post_view(post))
            .collect())
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Comment> {
        let mut tables = self.tables.write().await;
        if !tables.posts.contains_key(&comment.post_id) {
            return Err(AppError::DatabaseError(format!(
                "post {} does not exist",
                comment.post_id
            )));
        }

        let id = tables.allocate_id();
        let created = Comment {
            id,
            post_id: Some(comment.post_id),
            author_id: comment.author_id,
            text: comment.text,
            created: Utc::now(),
        };
        tables.comments.insert(id, created.clone());
        Ok(created)
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentView>> {
        let tables = self.tables.read().await;
        let mut comments: Vec<&Comment> = tables
            .comments
            .values()
            .filter(|c| c.post_id == Some(post_id))
            .collect();
        comments.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));

        Ok(comments
            .into_iter()
            .filter_map(|c| {
                let author = tables.users.get(&c.author_id)?;
                Some(CommentView {
                    id: c.id,
                    post_id: c.post_id,
                    text: c.text.clone(),
                    created: c.created,
                    author: AuthorView::from(author),
                })
            })
            .collect())
    }

    async fn create_follow(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let exists = tables
            .follows
            .values()
            .any(|f| f.user_id == user_id && f.author_id == author_id);
        if exists {
            return Ok(false);
        }

        let id = tables.allocate_id();
        tables.follows.insert(
            id,
            Follow {
                id,
                user_id,
                author_id,
            },
        );
        Ok(true)
    }

    async fn delete_follow(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.follows.len();
        tables
            .follows
            .retain(|_, f| !(f.user_id == user_id && f.author_id == author_id));
        Ok(tables.follows.len() < before)
    }

    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .values()
            .any(|f| f.user_id == user_id && f.author_id == author_id))
    }

    async fn count_follows(&self) -> Result<i64> {
        Ok(self.tables.read().await.follows.len() as i64)
    }
}
