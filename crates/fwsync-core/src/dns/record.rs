// # Answer Records
//
// Narrow view of a DNS answer section: addresses, aliases, and everything
// else. Owner and target names keep the presentation form they arrived in
// (fully qualified, trailing dot, original case).

use hickory_proto::op::Message;
use hickory_proto::rr::{RData, Record};
use std::net::IpAddr;

/// One record of an answer section, as seen by the resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerRecord {
    /// A or AAAA record
    Address {
        /// Owner name
        owner: String,
        /// The address value
        addr: IpAddr,
    },
    /// CNAME record
    Alias {
        /// Owner name
        owner: String,
        /// Name the owner points at
        target: String,
    },
    /// Any other record type (ignored by the resolver)
    Other {
        /// Owner name
        owner: String,
    },
}

impl AnswerRecord {
    /// Convenience constructor for address records
    pub fn address(owner: impl Into<String>, addr: IpAddr) -> Self {
        Self::Address {
            owner: owner.into(),
            addr,
        }
    }

    /// Convenience constructor for alias records
    pub fn alias(owner: impl Into<String>, target: impl Into<String>) -> Self {
        Self::Alias {
            owner: owner.into(),
            target: target.into(),
        }
    }

    /// The owner name of this record
    pub fn owner(&self) -> &str {
        match self {
            Self::Address { owner, .. } | Self::Alias { owner, .. } | Self::Other { owner } => owner,
        }
    }
}

impl From<&Record> for AnswerRecord {
    fn from(record: &Record) -> Self {
        let owner = record.name().to_string();
        match record.data() {
            Some(RData::A(a)) => Self::Address {
                owner,
                addr: IpAddr::V4(a.0),
            },
            Some(RData::AAAA(aaaa)) => Self::Address {
                owner,
                addr: IpAddr::V6(aaaa.0),
            },
            Some(RData::CNAME(cname)) => Self::Alias {
                owner,
                target: cname.0.to_string(),
            },
            _ => Self::Other { owner },
        }
    }
}

/// The answer section of `message` as [`AnswerRecord`]s, in message order
pub fn answer_records(message: &Message) -> Vec<AnswerRecord> {
    message.answers().iter().map(AnswerRecord::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::rr::rdata::{A, CNAME, TXT};
    use hickory_proto::rr::{Name, RecordType};
    use std::net::Ipv4Addr;
    use std::str::FromStr;

    fn record(name: &str, rdata: RData) -> Record {
        Record::from_rdata(Name::from_str(name).unwrap(), 300, rdata)
    }

    #[test]
    fn test_a_record_converts_to_address() {
        let rec = record("www.example.com.", RData::A(A(Ipv4Addr::new(192, 0, 2, 10))));
        assert_eq!(
            AnswerRecord::from(&rec),
            AnswerRecord::address("www.example.com.", IpAddr::from([192, 0, 2, 10]))
        );
    }

    /// Append `name` in uncompressed wire form
    fn push_name(buf: &mut Vec<u8>, name: &str) {
        for label in name.trim_end_matches('.').split('.') {
            buf.push(label.len() as u8);
            buf.extend_from_slice(label.as_bytes());
        }
        buf.push(0);
    }

    /// Append one IN-class answer with a 300 s TTL
    fn push_answer(buf: &mut Vec<u8>, owner: &str, rtype: u16, rdata: &[u8]) {
        push_name(buf, owner);
        buf.extend_from_slice(&rtype.to_be_bytes());
        buf.extend_from_slice(&1u16.to_be_bytes());
        buf.extend_from_slice(&300u32.to_be_bytes());
        buf.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
        buf.extend_from_slice(rdata);
    }

    #[test]
    fn test_cname_from_wire_keeps_case_and_trailing_dot() {
        // Response header: id, flags, 0 questions, 2 answers
        let mut wire = vec![0x12, 0x34, 0x81, 0x80, 0, 0, 0, 2, 0, 0, 0, 0];
        let mut target = Vec::new();
        push_name(&mut target, "Edge.CDN.example.net.");
        push_answer(&mut wire, "www.example.com.", 5, &target);
        push_answer(&mut wire, "Edge.CDN.example.net.", 1, &[192, 0, 2, 10]);

        let message = Message::from_vec(&wire).unwrap();
        let records = answer_records(&message);

        assert_eq!(
            records[0],
            AnswerRecord::alias("www.example.com.", "Edge.CDN.example.net.")
        );
        assert_eq!(
            crate::dns::resolve(&records, "www.example.com."),
            vec![IpAddr::from([192, 0, 2, 10])]
        );
    }

    #[test]
    fn test_other_types_are_ignored() {
        let rec = record("example.com.", RData::TXT(TXT::new(vec!["v=spf1 -all".to_string()])));
        assert_eq!(rec.record_type(), RecordType::TXT);
        assert!(matches!(AnswerRecord::from(&rec), AnswerRecord::Other { .. }));
    }

    #[test]
    fn test_answer_records_preserve_order() {
        let mut message = Message::new();
        message.add_answer(record(
            "a.example.com.",
            RData::CNAME(CNAME(Name::from_str("b.example.com.").unwrap())),
        ));
        message.add_answer(record("b.example.com.", RData::A(A(Ipv4Addr::new(192, 0, 2, 1)))));

        let records = answer_records(&message);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].owner(), "a.example.com.");
        assert_eq!(records[1].owner(), "b.example.com.");
    }
}
