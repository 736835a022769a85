use crate::dto::{BookDto, LinkDto, LinkedCollectionResourceWrapperDto};
use uuid::Uuid;

/// Builds absolute URLs for the routes exposed by the API.
#[derive(Debug, Clone)]
pub struct LinkResolver {
    base_url: String,
}

impl LinkResolver {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn books_for_author(&self, author_id: Uuid) -> String {
        format!("{}/api/authors/{author_id}/books", self.base_url)
    }

    pub fn book_for_author(&self, author_id: Uuid, id: Uuid) -> String {
        format!("{}/{id}", self.books_for_author(author_id))
    }

    pub fn author_collection(&self, ids: &[Uuid]) -> String {
        let ids = ids
            .iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .join(",");
        format!("{}/api/authorcollections/{ids}", self.base_url)
    }
}

/// Appends the links for reading, deleting, replacing and patching `book`.
pub fn add_standard_links(mut book: BookDto, resolver: &LinkResolver) -> BookDto {
    let href = resolver.book_for_author(book.author_id, book.id);
    book.links.extend([
        LinkDto::new(href.clone(), "self", "GET"),
        LinkDto::new(href.clone(), "delete_book", "DELETE"),
        LinkDto::new(href.clone(), "update_book", "PUT"),
        LinkDto::new(href, "partially_update_book", "PATCH"),
    ]);
    book
}

pub fn add_collection_links(
    mut books: LinkedCollectionResourceWrapperDto<BookDto>,
    author_id: Uuid,
    resolver: &LinkResolver,
) -> LinkedCollectionResourceWrapperDto<BookDto> {
    books.links.push(LinkDto::new(
        resolver.books_for_author(author_id),
        "self",
        "GET",
    ));
    books
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Book;

    fn book(author_id: Uuid, id: Uuid) -> BookDto {
        BookDto::from(Book::new(id, "Ubik".to_string(), None, 202, author_id))
    }

    #[test]
    fn trailing_slash_is_ignored() {
        let resolver = LinkResolver::new("http://library.test/");
        let author_id = Uuid::nil();

        assert_eq!(
            resolver.books_for_author(author_id),
            "http://library.test/api/authors/00000000-0000-0000-0000-000000000000/books"
        );
    }

    #[test]
    fn book_gets_four_links_in_order() {
        let resolver = LinkResolver::new("http://library.test");
        let author_id = Uuid::new_v4();
        let id = Uuid::new_v4();

        let dto = add_standard_links(book(author_id, id), &resolver);

        let href = format!("http://library.test/api/authors/{author_id}/books/{id}");
        let links: Vec<_> = dto
            .links
            .iter()
            .map(|link| (link.rel.as_str(), link.method.as_str()))
            .collect();
        assert_eq!(
            links,
            [
                ("self", "GET"),
                ("delete_book", "DELETE"),
                ("update_book", "PUT"),
                ("partially_update_book", "PATCH"),
            ]
        );
        assert!(dto.links.iter().all(|link| link.href == href));
    }

    #[test]
    fn collection_links_to_itself() {
        let resolver = LinkResolver::new("http://library.test");
        let author_id = Uuid::new_v4();
        let wrapper = LinkedCollectionResourceWrapperDto::new(vec![book(author_id, Uuid::new_v4())]);

        let wrapper = add_collection_links(wrapper, author_id, &resolver);

        assert_eq!(
            wrapper.links,
            [LinkDto::new(
                format!("http://library.test/api/authors/{author_id}/books"),
                "self",
                "GET"
            )]
        );
        assert!(wrapper.value[0].links.is_empty());
    }

    #[test]
    fn author_collection_joins_ids_with_commas() {
        let resolver = LinkResolver::new("http://library.test");
        let ids = [Uuid::nil(), Uuid::from_u128(u128::MAX)];

        assert_eq!(
            resolver.author_collection(&ids),
            "http://library.test/api/authorcollections/\
             00000000-0000-0000-0000-000000000000,ffffffff-ffff-ffff-ffff-ffffffffffff"
        );
    }
}
