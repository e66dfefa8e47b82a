//! The canonical person schema.
//!
//! Every CSV export is mapped onto the same fixed set of fields. Each
//! [`Field`] carries its canonical snake_case name (used as the payload key
//! in the vector store) and the raw header it is read from by default.

macro_rules! person_fields {
    ($( $variant:ident => $name:literal, $header:literal; )+) => {
        /// A canonical field of a [`PersonRecord`](crate::models::PersonRecord).
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Field {
            $( $variant, )+
        }

        impl Field {
            /// All fields in schema order.
            pub const ALL: &'static [Field] = &[ $( Field::$variant, )+ ];

            /// Canonical field name, e.g. `"full_name"`.
            pub fn name(self) -> &'static str {
                match self {
                    $( Field::$variant => $name, )+
                }
            }

            /// Raw CSV header this field is read from, e.g. `"Full name"`.
            pub fn default_header(self) -> &'static str {
                match self {
                    $( Field::$variant => $header, )+
                }
            }
        }
    };
}

person_fields! {
    FullName => "full_name", "Full name";
    FirstName => "first_name", "First Name";
    MiddleInitial => "middle_initial", "Middle Initial";
    MiddleName => "middle_name", "Middle Name";
    LastName => "last_name", "Last Name";
    Gender => "gender", "Gender";
    BirthYear => "birth_year", "Birth Year";
    BirthDate => "birth_date", "Birth Date";
    Industry => "industry", "Industry";
    JobTitle => "job_title", "Job title";
    SubRole => "sub_role", "Sub Role";
    Skills => "skills", "Skills";
    Email => "email", "Emails";
    Mobile => "mobile", "Mobile";
    PhoneNumbers => "phone_numbers", "Phone numbers";
    Location => "location", "Location";
    LocationCountry => "location_country", "Location Country";
    LocationContinent => "location_continent", "Location Continent";
    LinkedinUrl => "linkedin_url", "LinkedIn Url";
    LinkedinUsername => "linkedin_username", "LinkedIn Username";
    FacebookUrl => "facebook_url", "Facebook Url";
    FacebookUsername => "facebook_username", "Facebook Username";
    TwitterUrl => "twitter_url", "Twitter Url";
    TwitterUsername => "twitter_username", "Twitter Username";
    GithubUrl => "github_url", "Github Url";
    GithubUsername => "github_username", "Github Username";
    CompanyName => "company_name", "Company Name";
    CompanyIndustry => "company_industry", "Company Industry";
    CompanyWebsite => "company_website", "Company Website";
    CompanySize => "company_size", "Company Size";
    CompanyFounded => "company_founded", "Company Founded";
    CompanyLinkedinUrl => "company_linkedin_url", "Company Linkedin Url";
    CompanyFacebookUrl => "company_facebook_url", "Company Facebook Url";
    CompanyTwitterUrl => "company_twitter_url", "Company Twitter Url";
    CompanyLocationName => "company_location_name", "Company Location Name";
    CompanyLocationCountry => "company_location_country", "Company Location Country";
}

impl Field {
    /// Number of fields in the schema.
    pub const COUNT: usize = Field::ALL.len();

    /// Position of this field in [`Field::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Look up a field by its canonical name.
    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.iter().copied().find(|f| f.name() == name)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
