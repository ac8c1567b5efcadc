//! Minimal readers for IAM Query API XML responses.

use std::collections::BTreeMap;

use quick_xml::events::Event;
use quick_xml::Reader;

fn local_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

/// Leaf values of each `<member>` directly inside `<container>`.
///
/// Nested members (e.g. `Tags` under a user) are ignored.
pub fn members(xml: &str, container: &str) -> Result<Vec<BTreeMap<String, String>>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut path: Vec<String> = Vec::new();
    let mut current: Option<BTreeMap<String, String>> = None;
    let mut out = Vec::new();

    let is_member_of_container = |path: &[String]| {
        let n = path.len();
        n >= 2 && path[n - 1] == "member" && path[n - 2] == container
    };

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                path.push(local_name(e.local_name().as_ref()));
                if is_member_of_container(path.as_slice()) {
                    current = Some(BTreeMap::new());
                }
            }
            Event::Empty(e) => {
                if is_member_of_container(path.as_slice()) {
                    if let Some(fields) = current.as_mut() {
                        fields.insert(local_name(e.local_name().as_ref()), String::new());
                    }
                }
            }
            Event::Text(t) => {
                let n = path.len();
                if n >= 1 && is_member_of_container(&path[..n - 1]) {
                    if let Some(fields) = current.as_mut() {
                        fields.insert(path[n - 1].clone(), t.unescape()?.into_owned());
                    }
                }
            }
            Event::End(_) => {
                if is_member_of_container(path.as_slice()) {
                    if let Some(fields) = current.take() {
                        out.push(fields);
                    }
                }
                path.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(out)
}

/// Text of the first `<tag>` element anywhere in the document.
pub fn first_text(xml: &str, tag: &str) -> Result<Option<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut inside = false;
    loop {
        match reader.read_event()? {
            Event::Start(e) => inside = e.local_name().as_ref() == tag.as_bytes(),
            Event::Text(t) if inside => return Ok(Some(t.unescape()?.into_owned())),
            Event::End(_) => inside = false,
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST_USERS: &str = r#"<ListUsersResponse xmlns="https://iam.amazonaws.com/doc/2010-05-08/">
  <ListUsersResult>
    <IsTruncated>true</IsTruncated>
    <Marker>page-2</Marker>
    <Users>
      <member>
        <UserName>alice</UserName>
        <Path>/</Path>
        <Tags>
          <member><Key>team</Key><Value>ops</Value></member>
        </Tags>
      </member>
      <member>
        <UserName>bob &amp; co</UserName>
        <PermissionsBoundary/>
      </member>
    </Users>
  </ListUsersResult>
</ListUsersResponse>"#;

    #[test]
    fn test_members_direct_children_only() {
        let users = members(LIST_USERS, "Users").unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0]["UserName"], "alice");
        assert!(!users[0].contains_key("Key"));
        assert_eq!(users[1]["UserName"], "bob & co");
        assert_eq!(users[1]["PermissionsBoundary"], "");
    }

    #[test]
    fn test_members_missing_container() {
        assert!(members(LIST_USERS, "AccessKeyMetadata").unwrap().is_empty());
    }

    #[test]
    fn test_first_text() {
        assert_eq!(first_text(LIST_USERS, "Marker").unwrap().as_deref(), Some("page-2"));
        assert_eq!(first_text(LIST_USERS, "IsTruncated").unwrap().as_deref(), Some("true"));
        assert_eq!(first_text(LIST_USERS, "Nope").unwrap(), None);
    }
}
