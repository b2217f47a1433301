use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use shelfkeep_core::{BookId, Criterion, DomainError, DomainResult, Entity, Filter, Predicate};

use crate::contains_ci;
use crate::isbn::Isbn;

/// Book genre, stored by name.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Genre {
    Fiction,
    NonFiction,
    Mystery,
    Thriller,
    ScienceFiction,
    Fantasy,
    Romance,
    Biography,
    History,
    Poetry,
    Children,
    Reference,
}

impl Genre {
    pub const ALL: [Genre; 12] = [
        Genre::Fiction,
        Genre::NonFiction,
        Genre::Mystery,
        Genre::Thriller,
        Genre::ScienceFiction,
        Genre::Fantasy,
        Genre::Romance,
        Genre::Biography,
        Genre::History,
        Genre::Poetry,
        Genre::Children,
        Genre::Reference,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::Fiction => "FICTION",
            Genre::NonFiction => "NON_FICTION",
            Genre::Mystery => "MYSTERY",
            Genre::Thriller => "THRILLER",
            Genre::ScienceFiction => "SCIENCE_FICTION",
            Genre::Fantasy => "FANTASY",
            Genre::Romance => "ROMANCE",
            Genre::Biography => "BIOGRAPHY",
            Genre::History => "HISTORY",
            Genre::Poetry => "POETRY",
            Genre::Children => "CHILDREN",
            Genre::Reference => "REFERENCE",
        }
    }
}

impl core::fmt::Display for Genre {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Genre {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Genre::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DomainError::validation(format!("unknown genre '{s}'")))
    }
}

/// A catalogued book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub genre: Genre,
    pub isbn: Isbn,
    pub publication_date: NaiveDate,
}

impl Entity for BookRecord {
    type Id = BookId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl BookRecord {
    pub fn from_new(id: BookId, book: NewBook) -> Self {
        Self {
            id,
            title: book.title,
            author: book.author,
            genre: book.genre,
            isbn: book.isbn,
            publication_date: book.publication_date,
        }
    }

    /// Overwrite every attribute except the identifier.
    pub fn apply_update(&mut self, book: NewBook) {
        self.title = book.title;
        self.author = book.author;
        self.genre = book.genre;
        self.isbn = book.isbn;
        self.publication_date = book.publication_date;
    }
}

/// Attributes for creating or replacing a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub genre: Genre,
    pub isbn: Isbn,
    pub publication_date: NaiveDate,
}

impl NewBook {
    pub fn validate(&self) -> DomainResult<()> {
        if self.title.trim().is_empty() {
            return Err(DomainError::validation("title cannot be empty"));
        }
        if self.author.trim().is_empty() {
            return Err(DomainError::validation("author cannot be empty"));
        }
        Ok(())
    }
}

/// Sortable book attributes for catalog searches.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookSortKey {
    Title,
    Author,
    PublicationDate,
}

impl BookSortKey {
    pub fn compare(&self, a: &BookRecord, b: &BookRecord) -> core::cmp::Ordering {
        match self {
            BookSortKey::Title => a.title.cmp(&b.title),
            BookSortKey::Author => a.author.cmp(&b.author),
            BookSortKey::PublicationDate => a.publication_date.cmp(&b.publication_date),
        }
    }
}

/// Concrete tests over a [`BookRecord`].
///
/// Text needles are lowercased at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookCriterion {
    TitleContains(String),
    AuthorContains(String),
    GenreIs(Genre),
    IsbnIs(Isbn),
    /// Inclusive on both ends; an open end is unbounded.
    PublishedBetween {
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
}

impl Criterion for BookCriterion {
    type Subject = BookRecord;

    fn matches(&self, book: &BookRecord) -> bool {
        match self {
            BookCriterion::TitleContains(needle) => contains_ci(&book.title, needle),
            BookCriterion::AuthorContains(needle) => contains_ci(&book.author, needle),
            BookCriterion::GenreIs(genre) => book.genre == *genre,
            BookCriterion::IsbnIs(isbn) => book.isbn == *isbn,
            BookCriterion::PublishedBetween { from, to } => {
                from.is_none_or(|f| book.publication_date >= f)
                    && to.is_none_or(|t| book.publication_date <= t)
            }
        }
    }
}

/// Title contains `title`, ignoring case. `None` means no constraint.
pub fn title_like(title: Option<&str>) -> Filter<BookCriterion> {
    title.and_then(|t| Predicate::filter(BookCriterion::TitleContains(t.to_lowercase())))
}

/// Author contains `author`, ignoring case. `None` means no constraint.
pub fn author_like(author: Option<&str>) -> Filter<BookCriterion> {
    author.and_then(|a| Predicate::filter(BookCriterion::AuthorContains(a.to_lowercase())))
}

pub fn genre_is(genre: Option<Genre>) -> Filter<BookCriterion> {
    genre.and_then(|g| Predicate::filter(BookCriterion::GenreIs(g)))
}

pub fn isbn_is(isbn: Option<Isbn>) -> Filter<BookCriterion> {
    isbn.and_then(|i| Predicate::filter(BookCriterion::IsbnIs(i)))
}

/// Publication date within `[from, to]`; both ends absent means no constraint.
pub fn published_between(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Filter<BookCriterion> {
    if from.is_none() && to.is_none() {
        return None;
    }
    Predicate::filter(BookCriterion::PublishedBetween { from, to })
}
