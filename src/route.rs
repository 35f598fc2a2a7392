
use quantifiable_derive::Quantifiable;//the derive macro

/// A range of virtual channels of an output port that a packet may use.
#[derive(Clone,Copy,Debug,PartialEq,Eq,Quantifiable)]
pub struct RouteCandidate
{
	pub output_port: usize,
	pub vc_start: usize,
	///Last virtual channel of the range, inclusive.
	pub vc_end: usize,
	pub priority: i64,
}

impl RouteCandidate
{
	pub fn contains(&self, vc:usize) -> bool
	{
		self.vc_start<=vc && vc<=self.vc_end
	}
	pub fn num_vcs(&self) -> usize
	{
		self.vc_end+1-self.vc_start
	}
}

/// The candidates returned by a routing function, kept with higher priorities first.
/// Candidates of equal priority keep their insertion order.
#[derive(Clone,Debug,Default,PartialEq,Quantifiable)]
pub struct OutputSet
{
	candidates: Vec<RouteCandidate>,
}

impl OutputSet
{
	pub fn new() -> OutputSet
	{
		OutputSet::default()
	}
	pub fn clear(&mut self)
	{
		self.candidates.clear();
	}
	///Add a single virtual channel of a port.
	pub fn add(&mut self, output_port:usize, vc:usize, priority:i64)
	{
		self.add_range(output_port,vc,vc,priority);
	}
	///Add the virtual channels `vc_start..=vc_end` of a port.
	pub fn add_range(&mut self, output_port:usize, vc_start:usize, vc_end:usize, priority:i64)
	{
		debug_assert!(vc_start<=vc_end);
		let candidate=RouteCandidate{output_port,vc_start,vc_end,priority};
		let position=self.candidates.iter().position(|c|c.priority<priority).unwrap_or(self.candidates.len());
		self.candidates.insert(position,candidate);
	}
	pub fn is_empty(&self) -> bool
	{
		self.candidates.is_empty()
	}
	pub fn candidates(&self) -> &[RouteCandidate]
	{
		&self.candidates
	}
	///Whether there is no candidate for the port.
	pub fn output_empty(&self, output_port:usize) -> bool
	{
		!self.candidates.iter().any(|c|c.output_port==output_port)
	}
	///Number of virtual channels offered at a port.
	pub fn num_vcs(&self, output_port:usize) -> usize
	{
		self.candidates.iter().filter(|c|c.output_port==output_port).map(|c|c.num_vcs()).sum()
	}
	///The `index`-th virtual channel offered at a port, together with the priority of its candidate.
	pub fn get_vc(&self, output_port:usize, index:usize) -> Option<(usize,i64)>
	{
		let mut remaining=index;
		for candidate in self.candidates.iter().filter(|c|c.output_port==output_port)
		{
			let n=candidate.num_vcs();
			if remaining<n
			{
				return Some((candidate.vc_start+remaining,candidate.priority));
			}
			remaining-=n;
		}
		None
	}
	///When the set offers exactly one virtual channel, its port and channel.
	pub fn single_port_vc(&self) -> Option<(usize,usize)>
	{
		match self.candidates.as_slice()
		{
			&[ref c] if c.vc_start==c.vc_end => Some((c.output_port,c.vc_start)),
			_ => None,
		}
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	#[test]
	fn priority_order_is_kept()
	{
		let mut set=OutputSet::new();
		set.add_range(0,0,1,1);
		set.add_range(2,0,3,5);
		set.add_range(1,2,3,1);
		let ports:Vec<usize>=set.candidates().iter().map(|c|c.output_port).collect();
		assert_eq!(ports,vec![2,0,1]);
	}
	#[test]
	fn vc_queries()
	{
		let mut set=OutputSet::new();
		set.add_range(1,0,1,0);
		set.add_range(1,3,3,0);
		assert_eq!(set.num_vcs(1),3);
		assert_eq!(set.get_vc(1,2),Some((3,0)));
		assert_eq!(set.get_vc(1,3),None);
		assert!(set.output_empty(0));
		assert_eq!(set.single_port_vc(),None);
		let mut single=OutputSet::new();
		single.add(4,2,0);
		assert_eq!(single.single_port_vc(),Some((4,2)));
	}
}

